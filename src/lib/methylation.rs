//! Methylation level tracks for bisulfite simulation.
//!
//! Levels are stored in a FASTA-layout file indexed like the reference, with
//! two records per contig: `<name>/TOP` and `<name>/BOT`. Each byte encodes a
//! methylation fraction in steps of 1/80 starting at `!` (level 0), so a `!`
//! means fully unmethylated and `q` fully methylated.

use crate::errors::SimError;
use crate::reference::ReferenceIndex;
use anyhow::Result;

/// Byte encoding the zero methylation level.
pub const ZERO_LEVEL: u8 = b'!';

/// Number of encoding steps per unit of methylation.
const LEVEL_STEPS: f64 = 80.0;

/// Decodes one level byte into a methylation fraction in `[0, 1]`.
#[inline]
#[must_use]
pub fn level_fraction(byte: u8) -> f64 {
    (f64::from(byte.saturating_sub(ZERO_LEVEL)) / LEVEL_STEPS).min(1.0)
}

/// Per-haplotype methylation levels, parallel to the materialized sequence.
///
/// Both tracks are empty when bisulfite simulation is disabled.
#[derive(Debug, Clone, Default)]
pub struct MethylationLevels {
    /// Top-strand (C) levels.
    pub top: Vec<u8>,
    /// Bottom-strand (G) levels.
    pub bottom: Vec<u8>,
}

impl MethylationLevels {
    /// Removes all levels.
    pub fn clear(&mut self) {
        self.top.clear();
        self.bottom.clear();
    }

    /// Whether any levels are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Track length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.top.len()
    }
}

/// Reader for a methylation-level FASTA with its FAI index.
pub struct MethylationReader {
    index: ReferenceIndex,
}

impl MethylationReader {
    /// Opens the level file together with its `.fai` index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its index is missing.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        Ok(Self { index: ReferenceIndex::open(path)? })
    }

    /// Loads the top and bottom level tracks for a contig.
    ///
    /// # Errors
    ///
    /// Returns an error if either track record is missing or its length does
    /// not match the contig length.
    pub fn load_contig(&mut self, contig: &str, expected_len: usize) -> Result<MethylationLevels> {
        let mut load = |suffix: &str| -> Result<Vec<u8>> {
            let name = format!("{contig}/{suffix}");
            let id = self
                .index
                .id_by_name(&name)
                .ok_or(SimError::ReferenceNotFound { ref_name: name })?;
            let track = self.index.read_sequence_bytes(id)?;
            if track.len() != expected_len {
                return Err(SimError::MethylationTrackMismatch {
                    contig: contig.to_string(),
                    expected: expected_len,
                    actual: track.len(),
                }
                .into());
            }
            Ok(track)
        };
        let top = load("TOP")?;
        let bottom = load("BOT")?;
        Ok(MethylationLevels { top, bottom })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_indexed_fasta;
    use tempfile::TempDir;

    #[test]
    fn test_level_fraction() {
        assert!((level_fraction(b'!') - 0.0).abs() < f64::EPSILON);
        assert!((level_fraction(b'!' + 40) - 0.5).abs() < f64::EPSILON);
        assert!((level_fraction(b'!' + 80) - 1.0).abs() < f64::EPSILON);
        // Out-of-range bytes clamp.
        assert!((level_fraction(b' ') - 0.0).abs() < f64::EPSILON);
        assert!((level_fraction(255) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_contig() {
        let dir = TempDir::new().unwrap();
        let path = write_indexed_fasta(
            dir.path(),
            "meth.fa",
            &[("chr1/TOP", "!5qq"), ("chr1/BOT", "qq5!")],
        );

        let mut reader = MethylationReader::open(&path).unwrap();
        let levels = reader.load_contig("chr1", 4).unwrap();
        assert_eq!(levels.top, b"!5qq");
        assert_eq!(levels.bottom, b"qq5!");
        assert_eq!(levels.len(), 4);
    }

    #[test]
    fn test_length_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write_indexed_fasta(
            dir.path(),
            "meth.fa",
            &[("chr1/TOP", "!!!"), ("chr1/BOT", "!!!")],
        );
        let mut reader = MethylationReader::open(&path).unwrap();
        assert!(reader.load_contig("chr1", 4).is_err());
    }

    #[test]
    fn test_missing_track() {
        let dir = TempDir::new().unwrap();
        let path = write_indexed_fasta(dir.path(), "meth.fa", &[("chr1/TOP", "!!!")]);
        let mut reader = MethylationReader::open(&path).unwrap();
        assert!(reader.load_contig("chr1", 3).is_err());
    }
}
