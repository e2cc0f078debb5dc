//! Stage orchestration: subsample -> assemble -> longest contig -> BLAST -> top hit.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assembler::Assembler;
use crate::blast::{wait_for_report, BlastClient, PollConfig, SubmitRequest};
use crate::contig::{select_longest, truncate_query};
use crate::error::PipelineError;
use crate::report::{top_hit, ExtractMode};
use crate::seqio::{write_fasta, FastaRecord};
use crate::subsample::{subsample_reads, ReadSet};

pub const LONGEST_CONTIG_FILE: &str = "longest_contig.fasta";
pub const REPORT_FILE: &str = "blast_report.txt";
pub const RESULTS_FILE: &str = "results.tsv";

/// Everything a run needs; nothing is read from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reads: ReadSet,
    pub outdir: PathBuf,
    pub max_lines: usize,
    /// Submit only the first N bases of the longest contig.
    pub truncate: Option<usize>,
    pub poll: PollConfig,
    pub extract_mode: ExtractMode,
    /// Entrez organism filter passed with the submission.
    pub organism: Option<String>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub sample: String,
    pub longest_contig: FastaRecord,
    pub query_len: usize,
    pub rid: String,
    pub species: String,
    pub report_path: PathBuf,
}

/// Runs all five stages in order. Any error is fatal; files written by
/// finished stages stay in `outdir`.
pub fn run<S>(
    config: &PipelineConfig,
    assembler: &dyn Assembler,
    client: &dyn BlastClient,
    sleep: S,
) -> Result<PipelineOutcome>
where
    S: FnMut(Duration),
{
    fs::create_dir_all(&config.outdir)
        .with_context(|| format!("Failed to create {}", config.outdir.display()))?;

    log::info!("[1/5] Subsampling reads (first {} lines)...", config.max_lines);
    let subset = subsample_reads(&config.reads, &config.outdir, config.max_lines)?;

    log::info!("[2/5] Running {} assembly...", assembler.name());
    let contigs_path = assembler.assemble(&subset, &config.outdir)?;
    if !contigs_path.is_file() {
        return Err(PipelineError::AssemblyFailure(format!(
            "{} did not produce {}",
            assembler.name(),
            contigs_path.display()
        ))
        .into());
    }

    log::info!("[3/5] Selecting longest contig...");
    let longest = select_longest(&contigs_path)?;
    write_fasta(&longest, config.outdir.join(LONGEST_CONTIG_FILE))?;
    log::info!("        {} ({} bp)", longest.name(), longest.len());

    let query = match config.truncate {
        Some(n) => {
            let query = truncate_query(&longest, n);
            write_fasta(&query, config.outdir.join(format!("query_{}.fasta", n)))?;
            query
        }
        None => longest.clone(),
    };

    log::info!("[4/5] Submitting {} bp query to BLAST...", query.len());
    let mut fasta = Vec::new();
    query.write_to(&mut fasta)?;
    let request = SubmitRequest::blastn_nt(String::from_utf8_lossy(&fasta).into_owned(), config.organism.clone());
    let submission = client.submit(&request)?;
    match submission.rtoe {
        Some(secs) => log::info!("        RID {} (estimated {}s)", submission.rid, secs),
        None => log::info!("        RID {}", submission.rid),
    }

    let report = wait_for_report(client, &submission.rid, &config.poll, sleep)?;
    let report_path = config.outdir.join(REPORT_FILE);
    fs::write(&report_path, &report)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    log::info!("[5/5] Extracting top hit...");
    let species = top_hit(&report, config.extract_mode)
        .ok_or_else(|| PipelineError::NoHits(report_path.clone()))?;

    Ok(PipelineOutcome {
        sample: config.reads.sample_name(),
        query_len: query.len(),
        longest_contig: longest,
        rid: submission.rid,
        species,
        report_path,
    })
}

/// Writes the one-row results table.
pub fn write_results(outcome: &PipelineOutcome, path: &Path) -> Result<()> {
    let mut output = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );

    writeln!(output, "Sample\tContig\tContig_Len\tQuery_Len\tRID\tPrediction")?;
    writeln!(
        output,
        "{}\t{}\t{}\t{}\t{}\t{}",
        outcome.sample,
        outcome.longest_contig.name(),
        outcome.longest_contig.len(),
        outcome.query_len,
        outcome.rid,
        outcome.species
    )?;
    output.flush()?;
    Ok(())
}
