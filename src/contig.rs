//! Longest contig selection and query derivation.

use anyhow::Result;
use std::path::Path;

use crate::error::PipelineError;
use crate::seqio::{FastaReader, FastaRecord};

/// Query length used by `--truncate` when no value is given.
pub const DEFAULT_QUERY_LEN: usize = 1000;

/// Returns the longest record in a FASTA file.
///
/// Ties go to the record that appears first in the file. A file without any
/// record is [`PipelineError::EmptyAssembly`].
pub fn select_longest(path: &Path) -> Result<FastaRecord> {
    let mut best: Option<FastaRecord> = None;
    let mut count = 0usize;

    for record in FastaReader::open(path)? {
        let record = record?;
        count += 1;
        if best.as_ref().map_or(true, |b| record.len() > b.len()) {
            best = Some(record);
        }
    }

    let best = best.ok_or_else(|| PipelineError::EmptyAssembly(path.to_path_buf()))?;
    log::debug!("        {} contigs scanned, longest {} ({} bp)", count, best.name(), best.len());
    Ok(best)
}

/// Keeps the header and the first `max_len` bases of `record`.
pub fn truncate_query(record: &FastaRecord, max_len: usize) -> FastaRecord {
    // Assembler output is ASCII, but never split inside a multi-byte char.
    let end = record
        .seq
        .char_indices()
        .nth(max_len)
        .map(|(i, _)| i)
        .unwrap_or(record.seq.len());
    FastaRecord::new(record.header.clone(), &record.seq[..end])
}
