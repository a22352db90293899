//! Haplotype materialization: reference plus variants in, concrete
//! per-haplotype sequences out.
//!
//! Contigs are materialized in two passes. Small variants build the
//! small-variant sequence together with the segment table that maps its
//! coordinates back to the original reference; structural variants then
//! rearrange that sequence into the final haplotype, building the segment
//! table the breakpoint and inserted-region queries run on. Methylation
//! level tracks, when configured, ride through both passes so they stay
//! parallel to the materialized sequence.

use crate::dna::reverse_complement;
use crate::errors::SimError;
use crate::methylation::{MethylationLevels, MethylationReader, ZERO_LEVEL};
use crate::reference::ReferenceIndex;
use crate::variants::pos_map::{GenomicInterval, IntervalKind, PositionMap, SmallVarSegment, Strand};
use crate::variants::record::{SmallVariant, StructuralVariant, VariantSet};
use anyhow::Result;
use std::path::Path;

/// Iterator over materialized (contig, haplotype) sequences.
pub struct VcfMaterializer {
    reference: ReferenceIndex,
    variants: Option<VariantSet>,
    methylation: Option<MethylationReader>,
    /// Number of haplotypes simulated per contig.
    pub num_haplotypes: usize,
    /// Position map of the most recently materialized haplotype.
    pub pos_map: PositionMap,
    next_ref: usize,
    next_hap: usize,
    /// Original bytes (and levels) of the contig currently being emitted.
    cached_ref: usize,
    original: Vec<u8>,
    original_levels: Option<MethylationLevels>,
}

impl VcfMaterializer {
    /// Opens the reference, the optional variants file, and the optional
    /// methylation level file.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable inputs or when a variant record names
    /// a contig absent from the reference index.
    pub fn new(
        reference_path: &Path,
        variants_path: Option<&Path>,
        methylation_path: Option<&Path>,
    ) -> Result<Self> {
        let reference = ReferenceIndex::open(reference_path)?;
        let variants = variants_path.map(VariantSet::load).transpose()?;
        if let Some(set) = &variants {
            for contig in set.contigs_with_records() {
                if reference.id_by_name(contig).is_none() {
                    return Err(SimError::ReferenceNotFound { ref_name: contig.clone() }.into());
                }
            }
        }
        let methylation = methylation_path.map(MethylationReader::open).transpose()?;
        let num_haplotypes = variants.as_ref().map_or(1, |set| set.num_haplotypes);

        Ok(Self {
            reference,
            variants,
            methylation,
            num_haplotypes,
            pos_map: PositionMap::default(),
            next_ref: 0,
            next_hap: 0,
            cached_ref: usize::MAX,
            original: Vec::new(),
            original_levels: None,
        })
    }

    /// The reference index backing this materializer.
    #[must_use]
    pub fn reference(&self) -> &ReferenceIndex {
        &self.reference
    }

    /// Variant set, when a variants file was configured.
    #[must_use]
    pub fn variants(&self) -> Option<&VariantSet> {
        self.variants.as_ref()
    }

    /// Original (unmodified) bytes of the contig most recently emitted by
    /// [`Self::materialize_next`].
    #[must_use]
    pub fn original_sequence(&self) -> &[u8] {
        &self.original
    }

    /// Materializes the next (contig, haplotype) pair.
    ///
    /// Fills `out_seq` with the haplotype sequence and, when a methylation
    /// file is configured, `out_levels` with its level tracks (`out_levels`
    /// is left untouched otherwise). Returns `false` when all pairs have
    /// been emitted.
    ///
    /// # Errors
    ///
    /// Returns an error when a variant record is inconsistent with the
    /// reference; these errors are fatal for the pipeline.
    pub fn materialize_next(
        &mut self,
        out_seq: &mut Vec<u8>,
        out_levels: &mut MethylationLevels,
        out_ref_id: &mut usize,
        out_hap_id: &mut usize,
    ) -> Result<bool> {
        if self.next_hap >= self.num_haplotypes {
            self.next_hap = 0;
            self.next_ref += 1;
        }
        if self.next_ref >= self.reference.num_seqs() {
            return Ok(false);
        }

        let ref_id = self.next_ref;
        let hap_id = self.next_hap;
        self.next_hap += 1;

        self.load_contig(ref_id)?;
        let contig_name = self.reference.sequence_name(ref_id);

        let contig_variants =
            self.variants.as_ref().and_then(|set| set.for_contig(&contig_name));

        match contig_variants {
            None => {
                out_seq.clear();
                out_seq.extend_from_slice(&self.original);
                self.pos_map = PositionMap::identity(self.original.len());
                if let Some(levels) = &self.original_levels {
                    *out_levels = levels.clone();
                }
            }
            Some(variants) => {
                let (small_seq, segments, small_levels) = apply_small_variants(
                    &contig_name,
                    &self.original,
                    &variants.small[hap_id],
                    self.original_levels.as_ref(),
                )?;
                let (sv_seq, intervals, sv_levels) = apply_structural_variants(
                    &contig_name,
                    &small_seq,
                    &variants.structural[hap_id],
                    &segments,
                    small_levels.as_ref(),
                )?;
                *out_seq = sv_seq;
                self.pos_map = PositionMap::from_parts(intervals, segments);
                if let Some(levels) = sv_levels {
                    *out_levels = levels;
                }
            }
        }

        *out_ref_id = ref_id;
        *out_hap_id = hap_id;
        Ok(true)
    }

    /// Loads and caches the original contig bytes (and levels) for `ref_id`.
    fn load_contig(&mut self, ref_id: usize) -> Result<()> {
        if self.cached_ref == ref_id {
            return Ok(());
        }
        self.original = self.reference.read_sequence(ref_id)?;
        self.original_levels = match &mut self.methylation {
            Some(reader) => {
                let name = self.reference.sequence_name(ref_id);
                Some(reader.load_contig(&name, self.original.len())?)
            }
            None => None,
        };
        self.cached_ref = ref_id;
        Ok(())
    }
}

/// Applies small variants to a contig, producing the small-variant sequence,
/// the segment table back to original coordinates, and shifted level tracks.
fn apply_small_variants(
    contig: &str,
    original: &[u8],
    variants: &[SmallVariant],
    levels: Option<&MethylationLevels>,
) -> Result<(Vec<u8>, Vec<SmallVarSegment>, Option<MethylationLevels>)> {
    let mut out = Vec::with_capacity(original.len());
    let mut out_levels = levels.map(|_| MethylationLevels::default());
    let mut segments = Vec::new();

    let mut cursor = 0usize; // original position consumed so far
    let mut seg_small_begin = 0usize;
    let mut seg_orig_begin = 0usize;

    let inconsistent = |pos: usize, reason: String| SimError::InconsistentVariant {
        contig: contig.to_string(),
        position: pos + 1,
        reason,
    };

    let copy_run = |out: &mut Vec<u8>,
                        out_levels: &mut Option<MethylationLevels>,
                        from: usize,
                        to: usize| {
        out.extend_from_slice(&original[from..to]);
        if let (Some(dst), Some(src)) = (out_levels.as_mut(), levels) {
            dst.top.extend_from_slice(&src.top[from..to]);
            dst.bottom.extend_from_slice(&src.bottom[from..to]);
        }
    };

    let cut_segment = |segments: &mut Vec<SmallVarSegment>,
                           seg_small_begin: usize,
                           small_end: usize,
                           seg_orig_begin: usize| {
        if small_end > seg_small_begin {
            segments.push(SmallVarSegment {
                begin: seg_small_begin,
                end: small_end,
                original_begin: seg_orig_begin,
                original_len: small_end - seg_small_begin,
            });
        }
    };

    for variant in variants {
        let pos = variant.position();
        if pos < cursor {
            return Err(inconsistent(pos, "overlaps the previous variant".to_string()).into());
        }
        if pos > original.len() {
            return Err(inconsistent(pos, "lies beyond the contig end".to_string()).into());
        }
        copy_run(&mut out, &mut out_levels, cursor, pos);
        cursor = pos;

        match variant {
            SmallVariant::Snv { ref_base, alt, .. } => {
                if original[pos] != *ref_base {
                    return Err(inconsistent(
                        pos,
                        format!(
                            "REF allele is {}, reference has {}",
                            *ref_base as char, original[pos] as char
                        ),
                    )
                    .into());
                }
                out.push(*alt);
                if let (Some(dst), Some(src)) = (out_levels.as_mut(), levels) {
                    dst.top.push(src.top[pos]);
                    dst.bottom.push(src.bottom[pos]);
                }
                cursor += 1;
            }
            SmallVariant::Insertion { seq, .. } => {
                cut_segment(&mut segments, seg_small_begin, out.len(), seg_orig_begin);
                segments.push(SmallVarSegment {
                    begin: out.len(),
                    end: out.len() + seq.len(),
                    original_begin: pos,
                    original_len: 0,
                });
                out.extend_from_slice(seq);
                if let Some(dst) = out_levels.as_mut() {
                    dst.top.extend(std::iter::repeat(ZERO_LEVEL).take(seq.len()));
                    dst.bottom.extend(std::iter::repeat(ZERO_LEVEL).take(seq.len()));
                }
                seg_small_begin = out.len();
                seg_orig_begin = pos;
            }
            SmallVariant::Deletion { ref_seq, .. } => {
                let del_end = pos + ref_seq.len();
                if del_end > original.len() {
                    return Err(
                        inconsistent(pos, "deletion runs past the contig end".to_string()).into()
                    );
                }
                if &original[pos..del_end] != ref_seq.as_slice() {
                    return Err(inconsistent(
                        pos,
                        "deleted REF bases do not match the reference".to_string(),
                    )
                    .into());
                }
                cut_segment(&mut segments, seg_small_begin, out.len(), seg_orig_begin);
                cursor = del_end;
                seg_small_begin = out.len();
                seg_orig_begin = del_end;
            }
        }
    }

    copy_run(&mut out, &mut out_levels, cursor, original.len());
    cut_segment(&mut segments, seg_small_begin, out.len(), seg_orig_begin);

    Ok((out, segments, out_levels))
}

/// Projects an original-reference position into small-variant coordinates.
///
/// Positions inside deleted runs snap to the deletion junction.
fn small_pos_from_original(segments: &[SmallVarSegment], orig: usize) -> usize {
    let idx = segments
        .partition_point(|seg| seg.original_begin + seg.original_len <= orig);
    match segments.get(idx) {
        Some(seg) if orig >= seg.original_begin => seg.begin + (orig - seg.original_begin),
        Some(seg) => seg.begin,
        None => segments.last().map_or(0, |seg| seg.end),
    }
}

/// Applies structural variants to the small-variant sequence, producing the
/// materialized haplotype, its interval table, and rearranged level tracks.
fn apply_structural_variants(
    contig: &str,
    small_seq: &[u8],
    variants: &[StructuralVariant],
    segments: &[SmallVarSegment],
    levels: Option<&MethylationLevels>,
) -> Result<(Vec<u8>, Vec<GenomicInterval>, Option<MethylationLevels>)> {
    let mut out = Vec::with_capacity(small_seq.len());
    let mut out_levels = levels.map(|_| MethylationLevels::default());
    let mut intervals = Vec::new();
    let mut cursor = 0usize; // small-variant position consumed so far

    let inconsistent = |pos: usize, reason: String| SimError::InconsistentVariant {
        contig: contig.to_string(),
        position: pos + 1,
        reason,
    };

    let copy_normal = |out: &mut Vec<u8>,
                           out_levels: &mut Option<MethylationLevels>,
                           intervals: &mut Vec<GenomicInterval>,
                           from: usize,
                           to: usize| {
        if to > from {
            intervals.push(GenomicInterval {
                begin: out.len(),
                end: out.len() + (to - from),
                kind: IntervalKind::Normal,
                small_var_begin: from,
                small_var_end: to,
                strand: Strand::Forward,
            });
            out.extend_from_slice(&small_seq[from..to]);
            if let (Some(dst), Some(src)) = (out_levels.as_mut(), levels) {
                dst.top.extend_from_slice(&src.top[from..to]);
                dst.bottom.extend_from_slice(&src.bottom[from..to]);
            }
        }
    };

    for variant in variants {
        // Structural coordinates come from the VCF on the original
        // reference; project them through the small-variant segments.
        let (begin, end) = match variant {
            StructuralVariant::Deletion { begin, end }
            | StructuralVariant::Inversion { begin, end } => (
                small_pos_from_original(segments, *begin),
                small_pos_from_original(segments, *end),
            ),
            StructuralVariant::Insertion { pos, .. } => {
                let p = small_pos_from_original(segments, *pos);
                (p, p)
            }
        };
        if begin < cursor {
            return Err(inconsistent(begin, "overlaps the previous variant".to_string()).into());
        }
        if end > small_seq.len() || begin > end {
            return Err(inconsistent(begin, "region runs past the contig end".to_string()).into());
        }

        copy_normal(&mut out, &mut out_levels, &mut intervals, cursor, begin);

        match variant {
            StructuralVariant::Deletion { .. } => {
                cursor = end;
            }
            StructuralVariant::Insertion { seq, .. } => {
                intervals.push(GenomicInterval {
                    begin: out.len(),
                    end: out.len() + seq.len(),
                    kind: IntervalKind::Inserted,
                    small_var_begin: begin,
                    small_var_end: begin,
                    strand: Strand::Forward,
                });
                out.extend_from_slice(seq);
                if let Some(dst) = out_levels.as_mut() {
                    dst.top.extend(std::iter::repeat(ZERO_LEVEL).take(seq.len()));
                    dst.bottom.extend(std::iter::repeat(ZERO_LEVEL).take(seq.len()));
                }
                cursor = begin;
            }
            StructuralVariant::Inversion { .. } => {
                intervals.push(GenomicInterval {
                    begin: out.len(),
                    end: out.len() + (end - begin),
                    kind: IntervalKind::Normal,
                    small_var_begin: begin,
                    small_var_end: end,
                    strand: Strand::Reverse,
                });
                out.extend_from_slice(&reverse_complement(&small_seq[begin..end]));
                if let (Some(dst), Some(src)) = (out_levels.as_mut(), levels) {
                    // Strand flip: top and bottom swap and reverse.
                    dst.top.extend(src.bottom[begin..end].iter().rev());
                    dst.bottom.extend(src.top[begin..end].iter().rev());
                }
                cursor = end;
            }
        }
    }

    copy_normal(&mut out, &mut out_levels, &mut intervals, cursor, small_seq.len());

    Ok((out, intervals, out_levels))
}
