//! FASTQ output, plain or gzip-compressed.
//!
//! Writers convert numeric Phred scores to Phred+33 ASCII on the way out.
//! The spill-file reader used by the join phase reads records back without
//! decoding qualities, so joined records are byte-identical to what the
//! workers produced.

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// A writer for FASTQ files, gzip-compressed when the path ends in `.gz`.
pub struct FastqWriter {
    inner: FastqWriterInner,
}

enum FastqWriterInner {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl FastqWriter {
    /// Creates a writer for the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let buf = BufWriter::new(file);
        let inner = if path.extension().is_some_and(|ext| ext == "gz") {
            FastqWriterInner::Gzip(GzEncoder::new(buf, Compression::default()))
        } else {
            FastqWriterInner::Plain(buf)
        };
        Ok(Self { inner })
    }

    /// Writes a record with numeric Phred qualities (converted to Phred+33).
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_record(&mut self, name: &str, seq: &[u8], qual: &[u8]) -> Result<()> {
        match &mut self.inner {
            FastqWriterInner::Plain(w) => write_record_to(w, name, seq, qual),
            FastqWriterInner::Gzip(w) => write_record_to(w, name, seq, qual),
        }
    }

    /// Writes a record whose qualities are already Phred+33 encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_ascii_record(&mut self, name: &str, seq: &[u8], qual_ascii: &[u8]) -> Result<()> {
        match &mut self.inner {
            FastqWriterInner::Plain(w) => write_ascii_record_to(w, name, seq, qual_ascii),
            FastqWriterInner::Gzip(w) => write_ascii_record_to(w, name, seq, qual_ascii),
        }
    }

    /// Flushes and, for gzip output, terminates the compressed stream.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(self) -> Result<()> {
        match self.inner {
            FastqWriterInner::Plain(mut w) => w.flush().context("Failed to flush FASTQ output")?,
            FastqWriterInner::Gzip(w) => {
                w.finish().context("Failed to finish gzip stream")?.flush()?;
            }
        }
        Ok(())
    }
}

/// Write a FASTQ record with numeric qualities to any writer.
pub(crate) fn write_record_to<W: Write>(
    writer: &mut W,
    name: &str,
    seq: &[u8],
    qual: &[u8],
) -> Result<()> {
    writeln!(writer, "@{name}")?;
    writer.write_all(seq)?;
    writeln!(writer)?;
    writeln!(writer, "+")?;
    for &q in qual {
        writer.write_all(&[q.saturating_add(33).min(126)])?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Write a FASTQ record with Phred+33 qualities to any writer.
fn write_ascii_record_to<W: Write>(
    writer: &mut W,
    name: &str,
    seq: &[u8],
    qual_ascii: &[u8],
) -> Result<()> {
    writeln!(writer, "@{name}")?;
    writer.write_all(seq)?;
    writeln!(writer)?;
    writeln!(writer, "+")?;
    writer.write_all(qual_ascii)?;
    writeln!(writer)?;
    Ok(())
}

/// One FASTQ record read back from a spill file; qualities stay Phred+33.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    /// Read id, without the leading `@`.
    pub name: String,
    /// Sequence bytes.
    pub sequence: Vec<u8>,
    /// Phred+33 quality bytes.
    pub qualities: Vec<u8>,
}

/// Reads the next record from a buffered FASTQ stream.
///
/// Returns `Ok(None)` at end of input.
///
/// # Errors
///
/// Returns an error on I/O failure or a truncated record.
pub fn read_record<R: BufRead>(reader: &mut R) -> Result<Option<FastqRecord>> {
    let mut name = String::new();
    if reader.read_line(&mut name)? == 0 {
        return Ok(None);
    }
    let name = name.trim_end();
    let Some(name) = name.strip_prefix('@') else {
        bail!("Malformed FASTQ record: expected '@', got '{name}'");
    };
    let name = name.to_string();

    let mut sequence = String::new();
    let mut plus = String::new();
    let mut qualities = String::new();
    if reader.read_line(&mut sequence)? == 0
        || reader.read_line(&mut plus)? == 0
        || reader.read_line(&mut qualities)? == 0
    {
        bail!("Truncated FASTQ record '{name}'");
    }

    Ok(Some(FastqRecord {
        name,
        sequence: sequence.trim_end().as_bytes().to_vec(),
        qualities: qualities.trim_end().as_bytes().to_vec(),
    }))
}
