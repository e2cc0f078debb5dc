//! Sequence I/O Module
//!
//! FASTA reading and writing, plus a plain/gzip text opener used for read
//! files.
//!
//! # Examples
//! ```no_run
//! use contigblast::seqio::FastaReader;
//!
//! let mut reader = FastaReader::open("contigs.fasta").unwrap();
//! while let Some(record) = reader.read_next().unwrap() {
//!     println!("{}: {} bp", record.name(), record.seq.len());
//! }
//! ```

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

// ============================================================================
// FASTA Format
// ============================================================================

/// A FASTA record: the full header line and the concatenated sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Header text after '>' (description included, line terminator removed).
    pub header: String,
    /// Sequence with every body line joined and line terminators removed.
    pub seq: String,
}

impl FastaRecord {
    pub fn new(header: impl Into<String>, seq: impl Into<String>) -> Self {
        Self { header: header.into(), seq: seq.into() }
    }

    /// Sequence identifier (header text up to the first whitespace).
    pub fn name(&self) -> &str {
        self.header.split_whitespace().next().unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Writes the record as exactly two lines.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, ">{}", self.header)?;
        writeln!(out, "{}", self.seq)?;
        Ok(())
    }
}

/// Sequential reader for FASTA format files.
///
/// Reads records one at a time. Multi-line sequences are joined and both
/// `\n` and `\r\n` terminators are stripped.
pub struct FastaReader {
    reader: BufReader<File>,
    line_buf: String,
    current_header: Option<String>,
}

impl FastaReader {
    /// Opens a FASTA file for reading.
    ///
    /// Lines before the first header are skipped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open FASTA: {}", path.as_ref().display()))?;
        let mut reader = Self {
            reader: BufReader::with_capacity(1024 * 1024, file),
            line_buf: String::with_capacity(256),
            current_header: None,
        };

        loop {
            reader.line_buf.clear();
            if reader.reader.read_line(&mut reader.line_buf)? == 0 {
                break;
            }
            if let Some(header) = reader.line_buf.strip_prefix('>') {
                reader.current_header = Some(header.trim_end().to_string());
                break;
            }
        }

        Ok(reader)
    }

    /// Reads the next FASTA record from the file.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Successfully read a record
    /// - `Ok(None)` - End of file reached
    /// - `Err(e)` - I/O error occurred
    pub fn read_next(&mut self) -> Result<Option<FastaRecord>> {
        let header = match self.current_header.take() {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut seq = String::with_capacity(10000);

        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                break;
            }

            if let Some(next) = self.line_buf.strip_prefix('>') {
                self.current_header = Some(next.trim_end().to_string());
                break;
            }
            seq.push_str(self.line_buf.trim_end());
        }

        Ok(Some(FastaRecord { header, seq }))
    }
}

impl Iterator for FastaReader {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Writes a single record to `path`, replacing any previous content.
pub fn write_fasta<P: AsRef<Path>>(record: &FastaRecord, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );
    record.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Plain / gzip text input
// ============================================================================

/// Returns true when the path carries a `.gz` extension.
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Opens a text file for buffered reading, decompressing `.gz` files.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    if is_gzipped(path) {
        Ok(Box::new(BufReader::with_capacity(1024 * 1024, MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::with_capacity(1024 * 1024, file)))
    }
}
