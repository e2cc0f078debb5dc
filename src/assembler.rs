//! External assembler invocation.
//!
//! The assembler is a black box: it takes the subsampled reads and a thread
//! count, writes a directory, and is expected to leave a contigs FASTA in it.
//! `assemble` returns where that file should be; the pipeline verifies it.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::PipelineError;
use crate::subsample::ReadSet;

/// An assembler capability.
///
/// Contract: block until assembly finishes, return the path of the contigs
/// FASTA it should have produced. A failed run is reported as
/// [`PipelineError::AssemblyFailure`]; a missing artifact is caught by the
/// caller.
pub trait Assembler {
    fn name(&self) -> &str;

    fn assemble(&self, reads: &ReadSet, outdir: &Path) -> Result<PathBuf>;
}

/// Looks an executable up on `PATH`, or accepts an existing absolute path.
pub fn find_executable(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() && path.exists() {
        return Ok(path.to_path_buf());
    }

    if let Ok(paths) = env::var("PATH") {
        for dir in env::split_paths(&paths) {
            let full_path = dir.join(name);
            if full_path.exists() && full_path.is_file() {
                return Ok(full_path);
            }
        }
    }

    anyhow::bail!("{} not found in PATH. Please install it or add it to your PATH.", name)
}

fn check_status(tool: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.trim().lines().rev().take(10).collect();
    let tail: Vec<&str> = tail.into_iter().rev().collect();
    Err(PipelineError::AssemblyFailure(format!(
        "{} exited with code {:?}: {}",
        tool,
        output.status.code(),
        tail.join("\n")
    ))
    .into())
}

// ============================================================================
// SPAdes
// ============================================================================

/// SPAdes in `--isolate` mode; output `assembly/contigs.fasta`.
#[derive(Debug, Clone)]
pub struct Spades {
    pub executable: PathBuf,
    pub threads: usize,
}

impl Spades {
    pub const OUTPUT_DIR: &'static str = "assembly";
    pub const CONTIGS: &'static str = "contigs.fasta";

    pub fn command(&self, reads: &ReadSet, outdir: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("--isolate");
        match reads {
            ReadSet::Single(r) => {
                cmd.arg("-s").arg(r);
            }
            ReadSet::Paired(r1, r2) => {
                cmd.arg("-1").arg(r1).arg("-2").arg(r2);
            }
        }
        cmd.arg("-o").arg(outdir.join(Self::OUTPUT_DIR));
        if self.threads > 0 {
            cmd.arg("-t").arg(self.threads.to_string());
        }
        cmd
    }
}

impl Assembler for Spades {
    fn name(&self) -> &str {
        "SPAdes"
    }

    fn assemble(&self, reads: &ReadSet, outdir: &Path) -> Result<PathBuf> {
        let output = self
            .command(reads, outdir)
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;
        check_status("SPAdes", &output)?;

        Ok(outdir.join(Self::OUTPUT_DIR).join(Self::CONTIGS))
    }
}

// ============================================================================
// MEGAHIT
// ============================================================================

/// MEGAHIT; output `megahit/final.contigs.fa`.
#[derive(Debug, Clone)]
pub struct Megahit {
    pub executable: PathBuf,
    pub threads: usize,
    pub min_contig_len: usize,
}

impl Megahit {
    pub const OUTPUT_DIR: &'static str = "megahit";
    pub const CONTIGS: &'static str = "final.contigs.fa";

    pub fn command(&self, reads: &ReadSet, outdir: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        match reads {
            ReadSet::Single(r) => {
                cmd.arg("-r").arg(r);
            }
            ReadSet::Paired(r1, r2) => {
                cmd.arg("-1").arg(r1).arg("-2").arg(r2);
            }
        }
        cmd.arg("-o").arg(outdir.join(Self::OUTPUT_DIR));
        if self.threads > 0 {
            cmd.arg("-t").arg(self.threads.to_string());
        }
        cmd.arg("--min-contig-len").arg(self.min_contig_len.to_string());
        cmd
    }
}

impl Assembler for Megahit {
    fn name(&self) -> &str {
        "MEGAHIT"
    }

    fn assemble(&self, reads: &ReadSet, outdir: &Path) -> Result<PathBuf> {
        // MEGAHIT refuses to write into an existing output directory.
        let megahit_dir = outdir.join(Self::OUTPUT_DIR);
        if megahit_dir.exists() {
            fs::remove_dir_all(&megahit_dir)?;
        }

        let output = self
            .command(reads, outdir)
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;
        check_status("MEGAHIT", &output)?;

        Ok(megahit_dir.join(Self::CONTIGS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_spades_paired_command() {
        let spades = Spades { executable: "spades.py".into(), threads: 8 };
        let reads = ReadSet::Paired("s_1.fastq".into(), "s_2.fastq".into());
        let cmd = spades.command(&reads, Path::new("out"));
        assert_eq!(
            args_of(&cmd),
            ["--isolate", "-1", "s_1.fastq", "-2", "s_2.fastq", "-o", "out/assembly", "-t", "8"]
        );
    }

    #[test]
    fn test_spades_single_without_threads() {
        let spades = Spades { executable: "spades.py".into(), threads: 0 };
        let cmd = spades.command(&ReadSet::Single("s.fastq".into()), Path::new("out"));
        assert_eq!(args_of(&cmd), ["--isolate", "-s", "s.fastq", "-o", "out/assembly"]);
    }

    #[test]
    fn test_megahit_single_command() {
        let megahit = Megahit { executable: "megahit".into(), threads: 4, min_contig_len: 200 };
        let cmd = megahit.command(&ReadSet::Single("s.fastq".into()), Path::new("out"));
        assert_eq!(
            args_of(&cmd),
            ["-r", "s.fastq", "-o", "out/megahit", "-t", "4", "--min-contig-len", "200"]
        );
    }

    #[test]
    fn test_find_executable_missing() {
        assert!(find_executable("definitely-not-an-assembler-xyz").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_run_is_assembly_failure() {
        let spades = Spades { executable: "false".into(), threads: 1 };
        let dir = tempfile::tempdir().unwrap();
        let err = spades
            .assemble(&ReadSet::Single(dir.path().join("r.fq")), dir.path())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::AssemblyFailure(_))
        ));
    }
}
