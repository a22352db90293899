//! Coordinate translation between the three spaces a simulated read lives in.
//!
//! A materialized haplotype is built in two passes: small variants (SNVs and
//! short indels) first, structural variants second. Each pass gets its own
//! coordinate space, so a position map answers three questions:
//!
//! * does an interval on the materialized haplotype cross a structural
//!   breakpoint?
//! * which structural segment covers a position, and is it novel (inserted)
//!   sequence with no counterpart in the reference?
//! * what interval on the small-variant space, and from there on the original
//!   reference, does a materialized interval correspond to?
//!
//! All queries are read-only binary searches; a map is shared freely across
//! worker threads.

/// Whether a structural segment carries reference-derived or novel sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// Sequence that exists (possibly inverted) in the small-variant space.
    Normal,
    /// Sequence inserted by a structural variant; absent from the reference.
    Inserted,
}

/// Orientation of a structural segment relative to the small-variant space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

/// One structural segment of a materialized haplotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicInterval {
    /// Begin on the materialized haplotype (inclusive).
    pub begin: usize,
    /// End on the materialized haplotype (exclusive).
    pub end: usize,
    /// Reference-derived or inserted.
    pub kind: IntervalKind,
    /// Begin of the corresponding small-variant interval (inclusive).
    /// Zero-width for inserted segments (the insertion anchor).
    pub small_var_begin: usize,
    /// End of the corresponding small-variant interval (exclusive).
    pub small_var_end: usize,
    /// Orientation; `Reverse` for segments produced by an inversion.
    pub strand: Strand,
}

/// One affine segment mapping small-variant coordinates to the original
/// reference. Inside small insertions `original_len` is zero and projection
/// clamps to the insertion anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SmallVarSegment {
    /// Begin on the small-variant space (inclusive).
    pub begin: usize,
    /// End on the small-variant space (exclusive).
    pub end: usize,
    /// Original-reference position corresponding to `begin`.
    pub original_begin: usize,
    /// Number of original positions covered; `end - begin` except inside
    /// inserted bases.
    pub original_len: usize,
}

/// Three-way coordinate translator for one materialized haplotype.
#[derive(Debug, Clone, Default)]
pub struct PositionMap {
    /// Structural segments, sorted, covering `[0, materialized_len)`.
    sv_intervals: Vec<GenomicInterval>,
    /// Small-variant segments, sorted, covering `[0, small_var_len)`.
    small_var_segments: Vec<SmallVarSegment>,
}

impl PositionMap {
    /// A map for a haplotype without any variants.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        if len == 0 {
            return Self::default();
        }
        Self {
            sv_intervals: vec![GenomicInterval {
                begin: 0,
                end: len,
                kind: IntervalKind::Normal,
                small_var_begin: 0,
                small_var_end: len,
                strand: Strand::Forward,
            }],
            small_var_segments: vec![SmallVarSegment {
                begin: 0,
                end: len,
                original_begin: 0,
                original_len: len,
            }],
        }
    }

    pub(crate) fn from_parts(
        sv_intervals: Vec<GenomicInterval>,
        small_var_segments: Vec<SmallVarSegment>,
    ) -> Self {
        debug_assert!(sv_intervals.windows(2).all(|w| w[0].end == w[1].begin));
        debug_assert!(small_var_segments.windows(2).all(|w| w[0].end == w[1].begin));
        Self { sv_intervals, small_var_segments }
    }

    /// Total length of the materialized haplotype covered by this map.
    #[must_use]
    pub fn materialized_len(&self) -> usize {
        self.sv_intervals.last().map_or(0, |ivl| ivl.end)
    }

    /// Index of the structural segment covering `pos`.
    fn sv_index(&self, pos: usize) -> usize {
        self.sv_intervals.partition_point(|ivl| ivl.end <= pos)
    }

    /// Returns whether `[begin, end)` spans two different structural
    /// segments, i.e. crosses a structural variant junction.
    #[must_use]
    pub fn overlaps_with_breakpoint(&self, begin: usize, end: usize) -> bool {
        if end <= begin {
            return false;
        }
        self.sv_index(begin) != self.sv_index(end - 1)
    }

    /// The structural segment covering `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is at or beyond the materialized length.
    #[must_use]
    pub fn genomic_interval(&self, pos: usize) -> &GenomicInterval {
        &self.sv_intervals[self.sv_index(pos)]
    }

    /// Translates `[begin, end)` on the materialized haplotype into the
    /// small-variant space.
    ///
    /// The result has `a > b` when the covering segment is inverted; callers
    /// swap the endpoints and remember the orientation. The interval must not
    /// cross a breakpoint (check [`Self::overlaps_with_breakpoint`] first).
    #[must_use]
    pub fn to_small_var_interval(&self, begin: usize, end: usize) -> (usize, usize) {
        let ivl = self.genomic_interval(begin);
        debug_assert!(end <= ivl.end);
        match ivl.strand {
            Strand::Forward => (
                ivl.small_var_begin + (begin - ivl.begin),
                ivl.small_var_begin + (end - ivl.begin),
            ),
            Strand::Reverse => (
                ivl.small_var_end - (begin - ivl.begin),
                ivl.small_var_end - (end - ivl.begin),
            ),
        }
    }

    /// Index of the small-variant segment covering `pos`.
    fn small_var_index(&self, pos: usize) -> usize {
        self.small_var_segments.partition_point(|seg| seg.end <= pos)
    }

    /// Projects one small-variant position onto the original reference.
    fn to_original_pos(&self, pos: usize) -> usize {
        let seg = &self.small_var_segments[self.small_var_index(pos)];
        seg.original_begin + (pos - seg.begin).min(seg.original_len)
    }

    /// Translates `[begin, end)` on the small-variant space into the original
    /// reference. Deleted reference bases spanned by the interval are
    /// included in the result; inserted bases clamp to their anchor.
    #[must_use]
    pub fn to_original_interval(&self, begin: usize, end: usize) -> (usize, usize) {
        if end <= begin {
            let p = self.to_original_pos(begin);
            return (p, p);
        }
        let p = self.to_original_pos(begin);
        let last = &self.small_var_segments[self.small_var_index(end - 1)];
        let q = last.original_begin + (end - last.begin).min(last.original_len);
        (p, q)
    }
}
