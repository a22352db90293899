//! Reference genome access through a FASTA file and its FAI index.
//!
//! The simulator needs random access to whole contigs: once to materialize a
//! haplotype and once more to realign reads against the original sequence.
//! The FAI index supplies contig names, lengths, byte offsets, and line
//! geometry; whole records are read one sequence line at a time directly
//! into the destination buffer, seeking over the line terminators, then
//! normalized to the `{A, C, G, T, N}` alphabet.

use crate::dna::normalize_base;
use crate::errors::SimError;
use anyhow::{bail, Context, Result};
use noodles::fasta::fai;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Reads one whole indexed record, guided by the FAI line geometry.
///
/// Each sequence line lands directly in its final position in the output
/// buffer; the seek distance between lines is the terminator width from the
/// index, so no staging copy or newline scan is needed.
fn read_indexed_record(file: &mut File, record: &fai::Record) -> Result<Vec<u8>> {
    let total = record.length() as usize;
    let per_line = record.line_bases() as usize;
    let gap = record.line_width().saturating_sub(record.line_bases()) as i64;
    if per_line == 0 && total > 0 {
        bail!("FAI record declares zero bases per line");
    }

    file.seek(SeekFrom::Start(record.offset()))?;
    let mut sequence = vec![0u8; total];
    let mut filled = 0;
    while filled < total {
        let line = per_line.min(total - filled);
        file.read_exact(&mut sequence[filled..filled + line])?;
        filled += line;
        if filled < total {
            file.seek(SeekFrom::Current(gap))?;
        }
    }
    Ok(sequence)
}

/// Random-access reader over an indexed reference FASTA.
pub struct ReferenceIndex {
    /// Index records, in file order.
    records: Vec<fai::Record>,
    /// Open handle on the FASTA file.
    file: File,
    /// FASTA path, for error messages.
    path: PathBuf,
}

impl ReferenceIndex {
    /// Opens a FASTA file together with its `.fai` index.
    ///
    /// # Errors
    ///
    /// Returns an error if the FASTA or its index is missing or unreadable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fai_path = PathBuf::from(format!("{}.fai", path.display()));
        if !fai_path.exists() {
            return Err(SimError::InvalidFileFormat {
                file_type: "FASTA".to_string(),
                path: path.display().to_string(),
                reason: "no .fai index found".to_string(),
            }
            .into());
        }

        let index = fai::read(&fai_path)
            .with_context(|| format!("Failed to read FAI index: {}", fai_path.display()))?;
        let records: Vec<fai::Record> = index.as_ref().to_vec();
        let file = File::open(path)
            .with_context(|| format!("Failed to open FASTA: {}", path.display()))?;

        Ok(Self { records, file, path: path.to_path_buf() })
    }

    /// Number of indexed sequences.
    #[must_use]
    pub fn num_seqs(&self) -> usize {
        self.records.len()
    }

    /// Name of the sequence with the given index.
    #[must_use]
    pub fn sequence_name(&self, i: usize) -> String {
        String::from_utf8_lossy(self.records[i].name().as_ref()).into_owned()
    }

    /// Length of the sequence with the given index.
    #[must_use]
    pub fn sequence_length(&self, i: usize) -> usize {
        self.records[i].length() as usize
    }

    /// Index of the sequence with the given name.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name() == name.as_bytes())
    }

    /// Reads a whole contig, normalized to the 5-symbol alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a truncated FASTA file.
    pub fn read_sequence(&mut self, i: usize) -> Result<Vec<u8>> {
        let mut sequence = self.read_sequence_bytes(i)?;
        for base in &mut sequence {
            *base = normalize_base(*base);
        }
        Ok(sequence)
    }

    /// Reads a whole indexed record without base normalization.
    ///
    /// Used for non-nucleotide tracks stored in FASTA layout, such as
    /// methylation levels.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a truncated FASTA file.
    pub fn read_sequence_bytes(&mut self, i: usize) -> Result<Vec<u8>> {
        let record = &self.records[i];
        read_indexed_record(&mut self.file, record).with_context(|| {
            format!(
                "Failed to read sequence '{}' from {}",
                String::from_utf8_lossy(record.name().as_ref()),
                self.path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_indexed_fasta;
    use tempfile::TempDir;

    #[test]
    fn test_open_and_read() {
        let dir = TempDir::new().unwrap();
        let path =
            write_indexed_fasta(dir.path(), "ref.fa", &[("chr1", "ACGTACGTAC"), ("chr2", "TTTT")]);

        let mut index = ReferenceIndex::open(&path).unwrap();
        assert_eq!(index.num_seqs(), 2);
        assert_eq!(index.sequence_name(0), "chr1");
        assert_eq!(index.sequence_length(0), 10);
        assert_eq!(index.sequence_name(1), "chr2");
        assert_eq!(index.sequence_length(1), 4);
        assert_eq!(index.id_by_name("chr2"), Some(1));
        assert_eq!(index.id_by_name("chrM"), None);

        assert_eq!(index.read_sequence(0).unwrap(), b"ACGTACGTAC");
        assert_eq!(index.read_sequence(1).unwrap(), b"TTTT");
        // Repeated reads must be independent of prior seeks.
        assert_eq!(index.read_sequence(0).unwrap(), b"ACGTACGTAC");
    }

    #[test]
    fn test_normalization() {
        let dir = TempDir::new().unwrap();
        let path = write_indexed_fasta(dir.path(), "ref.fa", &[("chr1", "acgtRYn-")]);

        let mut index = ReferenceIndex::open(&path).unwrap();
        assert_eq!(index.read_sequence(0).unwrap(), b"ACGTNNNN");
    }

    #[test]
    fn test_multi_line_sequence() {
        // A 10-base contig split across lines of 4 bases.
        let dir = TempDir::new().unwrap();
        let fasta_path = dir.path().join("ref.fa");
        std::fs::write(&fasta_path, ">chr1\nACGT\nACGT\nAC\n").unwrap();
        std::fs::write(format!("{}.fai", fasta_path.display()), "chr1\t10\t6\t4\t5\n").unwrap();

        let mut index = ReferenceIndex::open(&fasta_path).unwrap();
        assert_eq!(index.read_sequence(0).unwrap(), b"ACGTACGTAC");
    }

    #[test]
    fn test_missing_index() {
        let dir = TempDir::new().unwrap();
        let fasta_path = dir.path().join("ref.fa");
        std::fs::write(&fasta_path, ">chr1\nACGT\n").unwrap();
        assert!(ReferenceIndex::open(&fasta_path).is_err());
    }
}
