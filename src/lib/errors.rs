//! Custom error types for fgsim operations.

use thiserror::Error;

/// Result type alias for fgsim operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Error type for fgsim operations
#[derive(Error, Debug)]
pub enum SimError {
    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "FASTA", "VCF")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Required reference sequence not found
    #[error("Reference sequence '{ref_name}' not found in index")]
    ReferenceNotFound {
        /// The reference sequence name
        ref_name: String,
    },

    /// Variant record does not agree with the reference
    #[error("Inconsistent variant at {contig}:{position}: {reason}")]
    InconsistentVariant {
        /// Contig the record refers to
        contig: String,
        /// 1-based position from the record
        position: usize,
        /// Explanation of the inconsistency
        reason: String,
    },

    /// Methylation level track does not match the contig it annotates
    #[error("Methylation track for '{contig}' has length {actual}, expected {expected}")]
    MethylationTrackMismatch {
        /// Contig name
        contig: String,
        /// Contig length from the reference index
        expected: usize,
        /// Level track length found
        actual: usize,
    },

    /// Realignment produced a score that does not decode to an edit distance
    #[error("Alignment score {score} disagrees with observed edit distance {observed}")]
    AlignmentScore {
        /// Raw alignment score
        score: i64,
        /// Edit distance counted from the alignment path
        observed: u32,
    },
}
