//! The seam between the pipeline and technology-specific base-call models.
//!
//! A sequencing simulator turns a fragment of a materialized haplotype into
//! one read (single-end) or two mates (paired-end), together with a
//! [`SequencingSimulationInfo`] describing where the read really came from.

use crate::methylation::MethylationLevels;
use crate::simulate::fragment::Fragment;
use rand::rngs::StdRng;
use std::fmt;

/// Run-length CIGAR operations over `{M, I, D}`, as produced by simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    /// Consumes one read and one reference position.
    Match,
    /// Consumes one read position only.
    Insertion,
    /// Consumes one reference position only.
    Deletion,
}

impl CigarOp {
    /// SAM operation character.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
        }
    }
}

/// One run-length CIGAR element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarElement {
    pub op: CigarOp,
    pub len: u32,
}

/// Appends one base-level operation, merging with a trailing run.
pub fn push_op(cigar: &mut Vec<CigarElement>, op: CigarOp) {
    if let Some(last) = cigar.last_mut() {
        if last.op == op {
            last.len += 1;
            return;
        }
    }
    cigar.push(CigarElement { op, len: 1 });
}

/// True origin of one simulated read.
#[derive(Debug, Clone, Default)]
pub struct SequencingSimulationInfo {
    /// Contig index on the reference.
    pub ref_id: usize,
    /// Haplotype index the read was simulated from.
    pub hap_id: usize,
    /// Begin position on the materialized haplotype (leftmost consumed
    /// position, regardless of strand).
    pub begin_pos: usize,
    /// Strand the read was drawn from.
    pub is_forward: bool,
    /// Base-level alignment of the read against the materialized haplotype,
    /// in read orientation.
    pub cigar: Vec<CigarElement>,
}

impl SequencingSimulationInfo {
    /// Number of reference positions the CIGAR consumes.
    #[must_use]
    pub fn reference_len(&self) -> usize {
        self.cigar
            .iter()
            .filter(|e| matches!(e.op, CigarOp::Match | CigarOp::Deletion))
            .map(|e| e.len as usize)
            .sum()
    }

    /// Number of read positions the CIGAR consumes.
    #[must_use]
    pub fn query_len(&self) -> usize {
        self.cigar
            .iter()
            .filter(|e| matches!(e.op, CigarOp::Match | CigarOp::Insertion))
            .map(|e| e.len as usize)
            .sum()
    }

    /// Resets all fields for reuse.
    pub fn clear(&mut self) {
        self.ref_id = 0;
        self.hap_id = 0;
        self.begin_pos = 0;
        self.is_forward = true;
        self.cigar.clear();
    }
}

impl fmt::Display for SequencingSimulationInfo {
    /// Compact serialization appended to read names with
    /// `--embed-read-info`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "REF={} HAP={} BEGIN={} STRAND={} CIGAR=",
            self.ref_id,
            self.hap_id,
            self.begin_pos,
            if self.is_forward { 'F' } else { 'R' }
        )?;
        for element in &self.cigar {
            write!(f, "{}{}", element.len, element.op.symbol())?;
        }
        Ok(())
    }
}

/// A technology-specific base-call simulator.
///
/// Implementations draw all randomness from the worker-owned RNG passed in,
/// so calls are thread-local by construction. Simulation never fails: a
/// degenerate fragment yields a truncated (possibly empty) read with a
/// consistent info record.
pub trait SequencingSimulator: Send {
    /// Simulates one single-end read from a fragment of `haplotype`.
    #[allow(clippy::too_many_arguments)]
    fn simulate_single_end(
        &self,
        rng: &mut StdRng,
        out_seq: &mut Vec<u8>,
        out_qual: &mut Vec<u8>,
        out_info: &mut SequencingSimulationInfo,
        haplotype: &[u8],
        fragment: Fragment,
        levels: Option<&MethylationLevels>,
    );

    /// Simulates a read pair from opposite ends of a fragment.
    #[allow(clippy::too_many_arguments)]
    fn simulate_paired_end(
        &self,
        rng: &mut StdRng,
        out_seq_l: &mut Vec<u8>,
        out_qual_l: &mut Vec<u8>,
        out_info_l: &mut SequencingSimulationInfo,
        out_seq_r: &mut Vec<u8>,
        out_qual_r: &mut Vec<u8>,
        out_info_r: &mut SequencingSimulationInfo,
        haplotype: &[u8],
        fragment: Fragment,
        levels: Option<&MethylationLevels>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_op_merges_runs() {
        let mut cigar = Vec::new();
        push_op(&mut cigar, CigarOp::Match);
        push_op(&mut cigar, CigarOp::Match);
        push_op(&mut cigar, CigarOp::Insertion);
        push_op(&mut cigar, CigarOp::Match);
        assert_eq!(
            cigar,
            vec![
                CigarElement { op: CigarOp::Match, len: 2 },
                CigarElement { op: CigarOp::Insertion, len: 1 },
                CigarElement { op: CigarOp::Match, len: 1 },
            ]
        );
    }

    #[test]
    fn test_lengths() {
        let info = SequencingSimulationInfo {
            cigar: vec![
                CigarElement { op: CigarOp::Match, len: 5 },
                CigarElement { op: CigarOp::Deletion, len: 2 },
                CigarElement { op: CigarOp::Insertion, len: 1 },
                CigarElement { op: CigarOp::Match, len: 3 },
            ],
            ..Default::default()
        };
        assert_eq!(info.reference_len(), 10);
        assert_eq!(info.query_len(), 9);
    }

    #[test]
    fn test_serialization() {
        let info = SequencingSimulationInfo {
            ref_id: 1,
            hap_id: 0,
            begin_pos: 42,
            is_forward: false,
            cigar: vec![
                CigarElement { op: CigarOp::Match, len: 8 },
                CigarElement { op: CigarOp::Insertion, len: 1 },
            ],
        };
        assert_eq!(info.to_string(), "REF=1 HAP=0 BEGIN=42 STRAND=R CIGAR=8M1I");
    }
}
