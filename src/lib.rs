//! contigblast - species identification from a subset of sequencing reads
//!
//! A short linear pipeline that:
//!   1. Subsamples the leading lines of a FASTQ file (or pair)
//!   2. Assembles the subset with an external assembler (SPAdes / MEGAHIT)
//!   3. Picks the longest contig
//!   4. Searches it against NCBI nt with the BLAST URL API
//!   5. Reports the organism of the top hit
//!
//! # Modules
//! - `seqio`: FASTA reading/writing and transparent gzip input
//! - `subsample`: leading-line read subsampling
//! - `assembler`: external assembler invocation behind the `Assembler` trait
//! - `contig`: longest contig selection and query derivation
//! - `blast`: BLAST URL API client and the submit/poll/fetch state machine
//! - `report`: top-hit extraction from the text report
//! - `pipeline`: stage orchestration
//! - `error`: the pipeline's fatal error conditions

pub mod error;
pub mod seqio;
pub mod subsample;
pub mod assembler;
pub mod contig;
pub mod blast;
pub mod report;
pub mod pipeline;

pub use error::PipelineError;
