//! Read input resolution and leading-line subsampling.
//!
//! A FASTQ record spans four lines, so capping at `max_lines` keeps the
//! first `max_lines / 4` reads. Lines are copied byte for byte; nothing is
//! parsed or validated.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::seqio::open_text;

/// 400,000 lines = 100,000 FASTQ records.
pub const DEFAULT_MAX_LINES: usize = 400_000;

const SINGLE_SUFFIXES: [&str; 4] = [".fastq", ".fq", ".fastq.gz", ".fq.gz"];

const PAIR_SUFFIXES: [(&str, &str); 8] = [
    ("_R1.fastq.gz", "_R2.fastq.gz"),
    ("_R1.fq.gz", "_R2.fq.gz"),
    ("_1.fastq.gz", "_2.fastq.gz"),
    ("_1.fq.gz", "_2.fq.gz"),
    ("_R1.fastq", "_R2.fastq"),
    ("_R1.fq", "_R2.fq"),
    ("_1.fastq", "_2.fastq"),
    ("_1.fq", "_2.fq"),
];

/// One read file, or two co-indexed mates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSet {
    Single(PathBuf),
    Paired(PathBuf, PathBuf),
}

impl ReadSet {
    pub fn is_paired(&self) -> bool {
        matches!(self, ReadSet::Paired(..))
    }

    /// Resolves the CLI input into concrete read files.
    ///
    /// Single-end: `input` itself, or `input` + a FASTQ suffix.
    /// Paired-end: `input` is a sample base name (`{base}_R1.fastq.gz`, ...).
    pub fn resolve(input: &Path, paired: bool) -> Result<Self> {
        if paired {
            return find_fastq_pair(input);
        }

        if input.is_file() {
            return Ok(ReadSet::Single(input.to_path_buf()));
        }
        for suffix in SINGLE_SUFFIXES {
            let candidate = with_suffix(input, suffix);
            if candidate.is_file() {
                return Ok(ReadSet::Single(candidate));
            }
        }
        Err(PipelineError::InputNotFound(input.to_path_buf()).into())
    }

    /// Sample name used in the results table.
    pub fn sample_name(&self) -> String {
        let first = match self {
            ReadSet::Single(r) | ReadSet::Paired(r, _) => r,
        };
        let file_name = first.file_name().and_then(|s| s.to_str()).unwrap_or("sample");
        let mut name = file_name.trim_end_matches(".gz");
        for ext in [".fastq", ".fq"] {
            name = name.trim_end_matches(ext);
        }
        if self.is_paired() {
            for mate in ["_R1", "_1"] {
                if let Some(stripped) = name.strip_suffix(mate) {
                    name = stripped;
                    break;
                }
            }
        }
        name.to_string()
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn find_fastq_pair(base: &Path) -> Result<ReadSet> {
    for (r1_suffix, r2_suffix) in PAIR_SUFFIXES {
        let r1 = with_suffix(base, r1_suffix);
        let r2 = with_suffix(base, r2_suffix);
        if r1.is_file() && r2.is_file() {
            return Ok(ReadSet::Paired(r1, r2));
        }
    }

    // Report the mate we looked for first, so the message points at a file.
    Err(PipelineError::InputNotFound(with_suffix(base, "_R1.fastq.gz")).into())
}

/// Outcome of subsampling one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsampleStats {
    pub lines: usize,
    /// True when the input had more lines than the cap.
    pub truncated: bool,
}

/// Copies the first `max_lines` lines of `input` into `output`.
pub fn subsample_file(input: &Path, output: &Path, max_lines: usize) -> Result<SubsampleStats> {
    if !input.is_file() {
        return Err(PipelineError::InputNotFound(input.to_path_buf()).into());
    }

    let mut reader = open_text(input)?;
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let mut line = Vec::with_capacity(512);
    let mut lines = 0usize;
    while lines < max_lines {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write_all(&line)?;
        lines += 1;
    }

    let truncated = lines == max_lines && !reader.fill_buf()?.is_empty();
    writer.flush()?;

    Ok(SubsampleStats { lines, truncated })
}

/// Subsamples every file of `reads` into `outdir` and returns the new set.
pub fn subsample_reads(reads: &ReadSet, outdir: &Path, max_lines: usize) -> Result<ReadSet> {
    let subset = match reads {
        ReadSet::Single(r) => {
            let out = outdir.join("subsampled.fastq");
            log_stats(r, subsample_file(r, &out, max_lines)?);
            ReadSet::Single(out)
        }
        ReadSet::Paired(r1, r2) => {
            let out1 = outdir.join("subsampled_1.fastq");
            let out2 = outdir.join("subsampled_2.fastq");
            log_stats(r1, subsample_file(r1, &out1, max_lines)?);
            log_stats(r2, subsample_file(r2, &out2, max_lines)?);
            ReadSet::Paired(out1, out2)
        }
    };
    Ok(subset)
}

fn log_stats(input: &Path, stats: SubsampleStats) {
    log::debug!(
        "        {}: kept {} lines (~{} reads){}",
        input.display(),
        stats.lines,
        stats.lines / 4,
        if stats.truncated { ", truncated" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fastq(n: usize) -> String {
        (0..n).map(|i| format!("@r{}\nACGT\n+\nIIII\n", i)).collect()
    }

    #[test]
    fn test_short_input_is_copied_whole() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fq");
        let output = dir.path().join("out.fq");
        let content = fastq(3);
        std::fs::write(&input, &content).unwrap();

        let stats = subsample_file(&input, &output, 400).unwrap();
        assert_eq!(stats, SubsampleStats { lines: 12, truncated: false });
        assert_eq!(std::fs::read_to_string(&output).unwrap(), content);
    }

    #[test]
    fn test_long_input_is_prefix_of_cap_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fq");
        let output = dir.path().join("out.fq");
        let content = fastq(10);
        std::fs::write(&input, &content).unwrap();

        let stats = subsample_file(&input, &output, 8).unwrap();
        assert!(stats.truncated);
        let out = std::fs::read_to_string(&output).unwrap();
        assert_eq!(out.lines().count(), 8);
        assert!(content.starts_with(&out));
    }

    #[test]
    fn test_exact_cap_is_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fq");
        let output = dir.path().join("out.fq");
        std::fs::write(&input, fastq(2)).unwrap();

        let stats = subsample_file(&input, &output, 8).unwrap();
        assert_eq!(stats, SubsampleStats { lines: 8, truncated: false });
    }

    #[test]
    fn test_missing_trailing_newline_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fq");
        let output = dir.path().join("out.fq");
        std::fs::write(&input, "@r\nAC\n+\nII").unwrap();

        subsample_file(&input, &output, 100).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "@r\nAC\n+\nII");
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = subsample_file(&dir.path().join("nope.fq"), &dir.path().join("o.fq"), 4)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InputNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_single_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("iso7.fq"), fastq(1)).unwrap();

        let reads = ReadSet::resolve(&dir.path().join("iso7"), false).unwrap();
        assert_eq!(reads, ReadSet::Single(dir.path().join("iso7.fq")));
        assert_eq!(reads.sample_name(), "iso7");
    }

    #[test]
    fn test_resolve_pair() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("iso7_R1.fastq"), fastq(1)).unwrap();
        std::fs::write(dir.path().join("iso7_R2.fastq"), fastq(1)).unwrap();

        let reads = ReadSet::resolve(&dir.path().join("iso7"), true).unwrap();
        assert!(reads.is_paired());
        assert_eq!(reads.sample_name(), "iso7");
    }

    #[test]
    fn test_resolve_pair_missing_mate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("iso7_1.fq"), fastq(1)).unwrap();

        let err = ReadSet::resolve(&dir.path().join("iso7"), true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InputNotFound(_))
        ));
    }

    #[test]
    fn test_subsample_pair_names() {
        let dir = tempfile::tempdir().unwrap();
        let r1 = dir.path().join("a_1.fq");
        let r2 = dir.path().join("a_2.fq");
        std::fs::write(&r1, fastq(5)).unwrap();
        std::fs::write(&r2, fastq(5)).unwrap();

        let subset = subsample_reads(&ReadSet::Paired(r1, r2), dir.path(), 4).unwrap();
        assert_eq!(
            subset,
            ReadSet::Paired(dir.path().join("subsampled_1.fastq"), dir.path().join("subsampled_2.fastq"))
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("subsampled_2.fastq")).unwrap(), fastq(1));
    }
}
