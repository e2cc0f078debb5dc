//! Fatal pipeline conditions.
//!
//! Every stage returns `anyhow::Result`; the conditions below are raised as
//! the error payload so callers can tell them apart with `downcast_ref`.
//! Command-line usage errors stay with clap, which prints them and exits 1.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input reads not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("assembly failed: {0}")]
    AssemblyFailure(String),

    #[error("assembly produced no contigs: {}", .0.display())]
    EmptyAssembly(PathBuf),

    #[error("BLAST submission returned no RID\n{snippet}")]
    SubmissionFailure { snippet: String },

    #[error("BLAST search {rid} failed (status {status})")]
    RemoteFailure { rid: String, status: String },

    #[error("BLAST search {rid} not ready after {waited_secs}s")]
    Timeout { rid: String, waited_secs: u64 },

    #[error("no significant alignments found in {}", .0.display())]
    NoHits(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = PipelineError::Timeout { rid: "ABC123".into(), waited_secs: 300 };
        assert_eq!(err.to_string(), "BLAST search ABC123 not ready after 300s");

        let err = PipelineError::InputNotFound(PathBuf::from("reads_1.fq"));
        assert!(err.to_string().ends_with("reads_1.fq"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = PipelineError::RemoteFailure {
            rid: "R1".into(),
            status: "FAILED".into(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::RemoteFailure { .. })
        ));
    }
}
