//! Top-hit extraction from a BLAST text report.
//!
//! Only the one-line hit summary under the
//! `Sequences producing significant alignments` heading is read:
//! ```text
//!                                                                   Score     E
//! Sequences producing significant alignments:                      (Bits)  Value
//!
//! NC_012920.1 Homo sapiens mitochondrion, complete genome           1847    0.0
//! ```

pub const HITS_MARKER: &str = "Sequences producing significant alignments";

/// How far past the marker to look, and which columns to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Short window, accession column dropped.
    Simple,
    /// Wider window, accession column kept.
    Robust,
}

impl ExtractMode {
    /// Raw lines examined after the marker.
    fn window(self) -> usize {
        match self {
            ExtractMode::Simple => 3,
            ExtractMode::Robust => 10,
        }
    }

    /// 0-based range of whitespace fields kept from the hit line.
    fn fields(self) -> (usize, usize) {
        match self {
            ExtractMode::Simple => (1, 8),
            ExtractMode::Robust => (0, 8),
        }
    }
}

fn is_rule(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '=' | '_'))
}

/// Returns the top hit line of the report, whitespace-normalized.
pub fn top_hit_line(report: &str, mode: ExtractMode) -> Option<String> {
    let mut lines = report.lines();
    lines.find(|line| line.contains(HITS_MARKER))?;

    lines
        .take(mode.window())
        .map(str::trim)
        .find(|line| !line.is_empty() && !is_rule(line) && !line.contains(HITS_MARKER))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Extracts the predicted organism from the top hit.
///
/// `None` when the report has no hit section or the window holds no hit.
pub fn top_hit(report: &str, mode: ExtractMode) -> Option<String> {
    let line = top_hit_line(report, mode)?;
    let (skip, take) = mode.fields();
    let species = line.split(' ').skip(skip).take(take - skip).collect::<Vec<_>>().join(" ");

    if species.is_empty() {
        None
    } else {
        Some(species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
BLASTN 2.16.0+
Query= NODE_1_length_5120_cov_44.1

Length=1000
                                                                      Score     E
Sequences producing significant alignments:                          (Bits)  Value

NC_012920.1 Homo sapiens mitochondrion, complete genome               1847    0.0
MN049977.1 Homo sapiens haplogroup H1 mitochondrion, complete genome  1847    0.0
";

    #[test]
    fn test_simple_skips_rule_and_blank_lines() {
        let report = format!(
            "header\n{}\n----------\n\n1_ACC123   Homo  sapiens mitochondrion complete genome 99.9\n",
            HITS_MARKER
        );
        assert_eq!(
            top_hit(&report, ExtractMode::Simple).as_deref(),
            Some("Homo sapiens mitochondrion complete genome 99.9")
        );
    }

    #[test]
    fn test_no_marker_is_empty() {
        let report = "BLASTN 2.16.0+\n\n***** No hits found *****\n";
        assert_eq!(top_hit(report, ExtractMode::Simple), None);
        assert_eq!(top_hit(report, ExtractMode::Robust), None);
    }

    #[test]
    fn test_marker_without_hit_lines() {
        let report = format!("{}:\n\n\n", HITS_MARKER);
        assert_eq!(top_hit(&report, ExtractMode::Robust), None);
    }

    #[test]
    fn test_robust_keeps_first_eight_fields() {
        assert_eq!(
            top_hit(REPORT, ExtractMode::Robust).as_deref(),
            Some("NC_012920.1 Homo sapiens mitochondrion, complete genome 1847 0.0")
        );
    }

    #[test]
    fn test_simple_on_ncbi_layout() {
        assert_eq!(
            top_hit(REPORT, ExtractMode::Simple).as_deref(),
            Some("Homo sapiens mitochondrion, complete genome 1847 0.0")
        );
    }

    #[test]
    fn test_hit_beyond_simple_window() {
        let report = format!("{}\n\n\n\n\nNZ_CP009072.1 Escherichia coli ATCC 25922\n", HITS_MARKER);
        assert_eq!(top_hit(&report, ExtractMode::Simple), None);
        assert_eq!(
            top_hit(&report, ExtractMode::Robust).as_deref(),
            Some("NZ_CP009072.1 Escherichia coli ATCC 25922")
        );
    }

    #[test]
    fn test_long_line_truncated_to_field_limit() {
        let report = format!("{}\nACC1 a b c d e f g h i j\n", HITS_MARKER);
        assert_eq!(top_hit(&report, ExtractMode::Simple).as_deref(), Some("a b c d e f g"));
        assert_eq!(top_hit(&report, ExtractMode::Robust).as_deref(), Some("ACC1 a b c d e f g"));
    }
}
