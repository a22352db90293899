//! True-alignment record construction and SAM header assembly.
//!
//! The builders translate a read's simulated origin on a materialized
//! haplotype back to the original reference, realign against the reference
//! infix to obtain the canonical CIGAR and MD string, and fill SAM flags and
//! the simulator's bookkeeping tags. The simulator's buffers are borrowed
//! read-only; orientation flips happen while emitting into the record.

use crate::align::{align_banded, md_string, path_reference_len, AlignOp};
use crate::dna::reverse_complement;
use crate::errors::SimError;
use crate::reference::ReferenceIndex;
use crate::simulate::sequencing::SequencingSimulationInfo;
use crate::variants::pos_map::{IntervalKind, PositionMap};
use anyhow::Result;
use bstr::BString;
use noodles::core::Position;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::record_buf::{QualityScores, RecordBuf, Sequence};
use noodles::sam::header::record::value::map::{self, ReferenceSequence};
use noodles::sam::header::record::value::Map;
use noodles::sam::Header;
use std::num::NonZeroUsize;

/// Edit distance vs the original reference.
#[must_use]
pub fn nm_tag() -> Tag {
    Tag::from([b'N', b'M'])
}

/// MD string vs the original reference.
#[must_use]
pub fn md_tag() -> Tag {
    Tag::from([b'M', b'D'])
}

/// Original reference contig name.
#[must_use]
pub fn original_ref_tag() -> Tag {
    Tag::from([b'o', b'R'])
}

/// Haplotype id used when simulating, 1-based.
#[must_use]
pub fn original_hap_tag() -> Tag {
    Tag::from([b'o', b'H'])
}

/// Begin position on the materialized haplotype.
#[must_use]
pub fn original_pos_tag() -> Tag {
    Tag::from([b'o', b'P'])
}

/// Strand the simulator drew the read from, `F` or `R`.
#[must_use]
pub fn original_strand_tag() -> Tag {
    Tag::from([b'o', b'S'])
}

/// Reason a record is unmapped: `B` breakpoint, `I` inserted region.
#[must_use]
pub fn unmapped_reason_tag() -> Tag {
    Tag::from([b'u', b'R'])
}

/// Summary of one built mate, used to complete pair fields.
struct MateSummary {
    unmapped: bool,
    /// 0-based begin on the original reference (mapped mates only).
    begin: usize,
    /// 0-based end on the original reference (mapped mates only).
    end: usize,
    reverse_complemented: bool,
}

/// Builds true-alignment records for reads simulated from one materialized
/// haplotype.
pub struct RecordBuilder<'a> {
    pos_map: &'a PositionMap,
    ref_name: &'a str,
    ref_seq: &'a [u8],
    ref_id: usize,
    hap_id: usize,
}

impl<'a> RecordBuilder<'a> {
    #[must_use]
    pub fn new(
        pos_map: &'a PositionMap,
        ref_name: &'a str,
        ref_seq: &'a [u8],
        ref_id: usize,
        hap_id: usize,
    ) -> Self {
        Self { pos_map, ref_name, ref_seq, ref_id, hap_id }
    }

    /// Builds the record for a single-end read.
    ///
    /// # Errors
    ///
    /// Returns an error when realignment fails its consistency check.
    pub fn build_single_end(
        &self,
        info: &SequencingSimulationInfo,
        seq: &[u8],
        qual: &[u8],
        name: &str,
    ) -> Result<RecordBuf> {
        let (record, _) = self.build_mate(info, seq, qual, name)?;
        Ok(record)
    }

    /// Builds both records of a read pair and completes the mate fields.
    ///
    /// # Errors
    ///
    /// Returns an error when realignment fails its consistency check.
    #[allow(clippy::too_many_arguments, clippy::similar_names)]
    pub fn build_paired_end(
        &self,
        info_l: &SequencingSimulationInfo,
        seq_l: &[u8],
        qual_l: &[u8],
        info_r: &SequencingSimulationInfo,
        seq_r: &[u8],
        qual_r: &[u8],
        name: &str,
    ) -> Result<(RecordBuf, RecordBuf)> {
        let (mut rec_l, mate_l) = self.build_mate(info_l, seq_l, qual_l, name)?;
        let (mut rec_r, mate_r) = self.build_mate(info_r, seq_r, qual_r, name)?;

        *rec_l.flags_mut() |= Flags::SEGMENTED | Flags::FIRST_SEGMENT;
        *rec_r.flags_mut() |= Flags::SEGMENTED | Flags::LAST_SEGMENT;

        match (mate_l.unmapped, mate_r.unmapped) {
            (false, false) => {
                *rec_l.flags_mut() |= Flags::PROPERLY_SEGMENTED;
                *rec_r.flags_mut() |= Flags::PROPERLY_SEGMENTED;

                // Both mates always map to the same contig here; the span is
                // positive on the upstream mate.
                let span =
                    (mate_l.end.max(mate_r.end) - mate_l.begin.min(mate_r.begin)) as i32;
                if mate_l.begin <= mate_r.begin {
                    *rec_l.template_length_mut() = span;
                    *rec_r.template_length_mut() = -span;
                } else {
                    *rec_l.template_length_mut() = -span;
                    *rec_r.template_length_mut() = span;
                }

                *rec_l.mate_reference_sequence_id_mut() = Some(self.ref_id);
                *rec_l.mate_alignment_start_mut() = Some(Position::try_from(mate_r.begin + 1)?);
                *rec_r.mate_reference_sequence_id_mut() = Some(self.ref_id);
                *rec_r.mate_alignment_start_mut() = Some(Position::try_from(mate_l.begin + 1)?);

                if mate_l.reverse_complemented {
                    *rec_r.flags_mut() |= Flags::MATE_REVERSE_COMPLEMENTED;
                }
                if mate_r.reverse_complemented {
                    *rec_l.flags_mut() |= Flags::MATE_REVERSE_COMPLEMENTED;
                }
            }
            (false, true) => {
                // Keep the pair grouped in coordinate-sorted output by
                // giving the unmapped mate its partner's position.
                *rec_r.reference_sequence_id_mut() = Some(self.ref_id);
                *rec_r.alignment_start_mut() = Some(Position::try_from(mate_l.begin + 1)?);
                *rec_l.flags_mut() |= Flags::MATE_UNMAPPED;
            }
            (true, false) => {
                *rec_l.reference_sequence_id_mut() = Some(self.ref_id);
                *rec_l.alignment_start_mut() = Some(Position::try_from(mate_r.begin + 1)?);
                *rec_r.flags_mut() |= Flags::MATE_UNMAPPED;
            }
            (true, true) => {
                *rec_l.flags_mut() |= Flags::MATE_UNMAPPED;
                *rec_r.flags_mut() |= Flags::MATE_UNMAPPED;
            }
        }

        Ok((rec_l, rec_r))
    }

    /// Builds one mate's record.
    fn build_mate(
        &self,
        info: &SequencingSimulationInfo,
        seq: &[u8],
        qual: &[u8],
        name: &str,
    ) -> Result<(RecordBuf, MateSummary)> {
        let mut record = RecordBuf::default();
        *record.name_mut() = Some(BString::from(name));

        let len = info.reference_len();
        let begin = info.begin_pos;

        let crosses = self.pos_map.overlaps_with_breakpoint(begin, begin + len);
        let inserted =
            !crosses && self.pos_map.genomic_interval(begin).kind == IntervalKind::Inserted;
        if crosses || inserted {
            self.fill_unaligned(&mut record, info, seq, qual, crosses);
            let summary = MateSummary {
                unmapped: true,
                begin: 0,
                end: 0,
                reverse_complemented: false,
            };
            return Ok((record, summary));
        }

        // Materialized coordinates -> small-variant coordinates; an inverted
        // segment shows up as a backwards interval.
        let (sv_a, sv_b) = self.pos_map.to_small_var_interval(begin, begin + len);
        let reversed = sv_a > sv_b;
        let (sv_a, sv_b) = if reversed { (sv_b, sv_a) } else { (sv_a, sv_b) };
        let (orig_a, orig_b) = self.pos_map.to_original_interval(sv_a, sv_b);

        // The simulator emitted the read in materialized-haplotype
        // orientation; the record must describe it in original-reference
        // orientation.
        let needs_flip = info.is_forward == reversed;
        let (out_seq, out_qual) = if needs_flip {
            (reverse_complement(seq), qual.iter().rev().copied().collect::<Vec<u8>>())
        } else {
            (seq.to_vec(), qual.to_vec())
        };

        let mut flags = Flags::empty();
        if needs_flip {
            flags |= Flags::REVERSE_COMPLEMENTED;
        }

        let infix = &self.ref_seq[orig_a..orig_b];
        let alignment = align_banded(infix, &out_seq)?;
        let md = md_string(&alignment.ops, infix, &out_seq);

        *record.flags_mut() = flags;
        *record.reference_sequence_id_mut() = Some(self.ref_id);
        *record.alignment_start_mut() = Some(Position::try_from(orig_a + 1)?);
        *record.cigar_mut() = path_to_cigar(&alignment.ops).into_iter().collect();
        *record.sequence_mut() = Sequence::from(out_seq);
        *record.quality_scores_mut() = QualityScores::from(out_qual);

        let data = record.data_mut();
        data.insert(nm_tag(), Value::from(alignment.edit_distance as i32));
        data.insert(md_tag(), Value::String(BString::from(md)));
        self.insert_origin_tags(&mut record, info);

        let summary = MateSummary {
            unmapped: false,
            begin: orig_a,
            end: orig_a + path_reference_len(&alignment.ops),
            reverse_complemented: needs_flip,
        };
        Ok((record, summary))
    }

    /// Fills an unmapped record, keeping the simulator's orientation.
    fn fill_unaligned(
        &self,
        record: &mut RecordBuf,
        info: &SequencingSimulationInfo,
        seq: &[u8],
        qual: &[u8],
        crosses_breakpoint: bool,
    ) {
        *record.flags_mut() = Flags::UNMAPPED;
        *record.sequence_mut() = Sequence::from(seq.to_vec());
        *record.quality_scores_mut() = QualityScores::from(qual.to_vec());
        record.data_mut().insert(
            unmapped_reason_tag(),
            Value::Character(if crosses_breakpoint { b'B' } else { b'I' }),
        );
        self.insert_origin_tags(record, info);
    }

    /// Tags describing the simulated origin, shared by both paths.
    fn insert_origin_tags(&self, record: &mut RecordBuf, info: &SequencingSimulationInfo) {
        let data = record.data_mut();
        data.insert(original_ref_tag(), Value::String(BString::from(self.ref_name)));
        data.insert(original_hap_tag(), Value::from(self.hap_id as i32 + 1));
        data.insert(original_pos_tag(), Value::from(info.begin_pos as i32));
        data.insert(
            original_strand_tag(),
            Value::Character(if info.is_forward { b'F' } else { b'R' }),
        );
    }
}

/// Converts a base-level alignment path into run-length SAM CIGAR ops.
fn path_to_cigar(ops: &[AlignOp]) -> Vec<Op> {
    let mut cigar: Vec<Op> = Vec::new();
    for op in ops {
        let kind = match op {
            AlignOp::Match => Kind::Match,
            AlignOp::Insertion => Kind::Insertion,
            AlignOp::Deletion => Kind::Deletion,
        };
        match cigar.last_mut() {
            Some(last) if last.kind() == kind => {
                *last = Op::new(kind, last.len() + 1);
            }
            _ => cigar.push(Op::new(kind, 1)),
        }
    }
    cigar
}

/// Builds the output SAM header: `@HD VN:1.4` plus one `@SQ` per reference
/// contig. Contig names come from the variant file header when present,
/// otherwise from the reference index; lengths always come from the index.
///
/// # Errors
///
/// Returns an error when a variant-file contig name is missing from the
/// reference index.
pub fn build_header(
    reference: &ReferenceIndex,
    variant_contigs: Option<&[String]>,
) -> Result<Header> {
    let mut builder = Header::builder()
        .set_header(Map::<map::Header>::new(map::header::Version::new(1, 4)));

    for i in 0..reference.num_seqs() {
        let name = variant_contigs
            .and_then(|names| names.get(i))
            .cloned()
            .unwrap_or_else(|| reference.sequence_name(i));
        let id = reference
            .id_by_name(&name)
            .ok_or_else(|| SimError::ReferenceNotFound { ref_name: name.clone() })?;
        let len = NonZeroUsize::new(reference.sequence_length(id)).ok_or_else(|| {
            SimError::InvalidFileFormat {
                file_type: "FASTA".to_string(),
                path: name.clone(),
                reason: "zero-length contig".to_string(),
            }
        })?;
        builder =
            builder.add_reference_sequence(BString::from(name), Map::<ReferenceSequence>::new(len));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::sequencing::{CigarElement, CigarOp};
    use crate::variants::pos_map::PositionMap;

    fn info(begin: usize, forward: bool, match_len: u32) -> SequencingSimulationInfo {
        SequencingSimulationInfo {
            ref_id: 0,
            hap_id: 0,
            begin_pos: begin,
            is_forward: forward,
            cigar: vec![CigarElement { op: CigarOp::Match, len: match_len }],
        }
    }

    fn cigar_string(record: &RecordBuf) -> String {
        record
            .cigar()
            .as_ref()
            .iter()
            .map(|op| {
                let symbol = match op.kind() {
                    Kind::Match => 'M',
                    Kind::Insertion => 'I',
                    Kind::Deletion => 'D',
                    _ => '?',
                };
                format!("{}{symbol}", op.len())
            })
            .collect()
    }

    fn tag_i32(record: &RecordBuf, tag: Tag) -> i32 {
        match record.data().get(&tag) {
            Some(Value::Int32(v)) => *v,
            Some(Value::Int8(v)) => i32::from(*v),
            Some(Value::UInt8(v)) => i32::from(*v),
            other => panic!("unexpected tag value {other:?}"),
        }
    }

    fn tag_char(record: &RecordBuf, tag: Tag) -> u8 {
        match record.data().get(&tag) {
            Some(Value::Character(c)) => *c,
            other => panic!("unexpected tag value {other:?}"),
        }
    }

    fn tag_string(record: &RecordBuf, tag: Tag) -> String {
        match record.data().get(&tag) {
            Some(Value::String(s)) => s.to_string(),
            other => panic!("unexpected tag value {other:?}"),
        }
    }

    /// Position map with four bases inserted at position 8 of a 16-base
    /// contig.
    fn insertion_pos_map() -> PositionMap {
        use crate::variants::pos_map::{GenomicInterval, SmallVarSegment, Strand};
        PositionMap::from_parts(
            vec![
                GenomicInterval {
                    begin: 0,
                    end: 8,
                    kind: IntervalKind::Normal,
                    small_var_begin: 0,
                    small_var_end: 8,
                    strand: Strand::Forward,
                },
                GenomicInterval {
                    begin: 8,
                    end: 12,
                    kind: IntervalKind::Inserted,
                    small_var_begin: 8,
                    small_var_end: 8,
                    strand: Strand::Forward,
                },
                GenomicInterval {
                    begin: 12,
                    end: 20,
                    kind: IntervalKind::Normal,
                    small_var_begin: 8,
                    small_var_end: 16,
                    strand: Strand::Forward,
                },
            ],
            vec![SmallVarSegment { begin: 0, end: 16, original_begin: 0, original_len: 16 }],
        )
    }

    /// Position map deleting positions 4..8 of a 16-base contig.
    fn deletion_pos_map() -> PositionMap {
        use crate::variants::pos_map::{GenomicInterval, SmallVarSegment, Strand};
        PositionMap::from_parts(
            vec![
                GenomicInterval {
                    begin: 0,
                    end: 4,
                    kind: IntervalKind::Normal,
                    small_var_begin: 0,
                    small_var_end: 4,
                    strand: Strand::Forward,
                },
                GenomicInterval {
                    begin: 4,
                    end: 12,
                    kind: IntervalKind::Normal,
                    small_var_begin: 8,
                    small_var_end: 16,
                    strand: Strand::Forward,
                },
            ],
            vec![SmallVarSegment { begin: 0, end: 16, original_begin: 0, original_len: 16 }],
        )
    }

    #[test]
    fn test_forward_single_end_record() {
        // One contig ACGTACGTAC, fragment [2, 6) on the forward strand.
        let reference = b"ACGTACGTAC";
        let pos_map = PositionMap::identity(10);
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        let record = builder
            .build_single_end(&info(2, true, 4), b"GTAC", &[40; 4], "sim.1")
            .unwrap();

        assert_eq!(record.flags(), Flags::empty());
        assert_eq!(record.reference_sequence_id(), Some(0));
        assert_eq!(record.alignment_start(), Position::new(3));
        assert_eq!(cigar_string(&record), "4M");
        assert_eq!(tag_i32(&record, nm_tag()), 0);
        assert_eq!(tag_string(&record, md_tag()), "4");
        assert_eq!(tag_i32(&record, original_hap_tag()), 1);
        assert_eq!(tag_i32(&record, original_pos_tag()), 2);
        assert_eq!(tag_char(&record, original_strand_tag()), b'F');
        assert_eq!(tag_string(&record, original_ref_tag()), "chr1");
        assert_eq!(record.sequence().as_ref(), b"GTAC");
    }

    #[test]
    fn test_reverse_single_end_record_is_flipped() {
        let reference = b"ACGTACGTAC";
        let pos_map = PositionMap::identity(10);
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        // A reverse-strand read of [0, 4): the simulator emits
        // revcomp(ACGT) = ACGT (palindrome), but with a distinguishable
        // quality gradient the flip is visible.
        let record = builder
            .build_single_end(&info(0, false, 4), b"ACGT", &[10, 20, 30, 40], "sim.2")
            .unwrap();

        assert!(record.flags().contains(Flags::REVERSE_COMPLEMENTED));
        assert_eq!(record.alignment_start(), Position::new(1));
        assert_eq!(cigar_string(&record), "4M");
        assert_eq!(tag_i32(&record, nm_tag()), 0);
        assert_eq!(tag_char(&record, original_strand_tag()), b'R');
        // Qualities were reversed along with the sequence.
        assert_eq!(record.quality_scores().as_ref(), &[40, 30, 20, 10]);
    }

    #[test]
    fn test_read_in_inserted_region_is_unmapped() {
        let reference = b"AAAACCCCGGGGTTTT";
        let pos_map = insertion_pos_map();
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        let record = builder
            .build_single_end(&info(8, true, 4), b"NNNN", &[40; 4], "sim.3")
            .unwrap();

        assert!(record.flags().contains(Flags::UNMAPPED));
        assert_eq!(record.reference_sequence_id(), None);
        assert_eq!(record.alignment_start(), None);
        assert_eq!(tag_char(&record, unmapped_reason_tag()), b'I');
        assert_eq!(record.sequence().as_ref(), b"NNNN");
        assert_eq!(tag_i32(&record, original_pos_tag()), 8);
    }

    #[test]
    fn test_read_crossing_breakpoint_is_unmapped() {
        let reference = b"AAAACCCCGGGGTTTT";
        let pos_map = deletion_pos_map();
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        let record = builder
            .build_single_end(&info(2, true, 4), b"AAGG", &[40; 4], "sim.4")
            .unwrap();

        assert!(record.flags().contains(Flags::UNMAPPED));
        assert_eq!(tag_char(&record, unmapped_reason_tag()), b'B');
    }

    #[test]
    fn test_mapped_read_behind_deletion_translates() {
        // Haplotype deletes reference [4, 8); a read at materialized [4, 8)
        // came from reference [8, 12).
        let reference = b"AAAACCCCGGGGTTTT";
        let pos_map = deletion_pos_map();
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        let record = builder
            .build_single_end(&info(4, true, 4), b"GGGG", &[40; 4], "sim.5")
            .unwrap();

        assert!(!record.flags().contains(Flags::UNMAPPED));
        assert_eq!(record.alignment_start(), Position::new(9));
        assert_eq!(tag_i32(&record, nm_tag()), 0);
    }

    #[test]
    fn test_paired_end_both_mapped() {
        // 400-base contig; mates at [100, 150) forward and [300, 350)
        // reverse.
        let reference: Vec<u8> = (0..400).map(|i| b"ACGT"[i % 4]).collect();
        let pos_map = PositionMap::identity(400);
        let builder = RecordBuilder::new(&pos_map, "chr1", &reference, 0, 0);

        let seq_l = reference[100..150].to_vec();
        let seq_r = reverse_complement(&reference[300..350]);
        let (rec_l, rec_r) = builder
            .build_paired_end(
                &info(100, true, 50),
                &seq_l,
                &[40; 50],
                &info(300, false, 50),
                &seq_r,
                &[40; 50],
                "sim.6",
            )
            .unwrap();

        for rec in [&rec_l, &rec_r] {
            assert!(rec.flags().contains(Flags::SEGMENTED));
            assert!(rec.flags().contains(Flags::PROPERLY_SEGMENTED));
        }
        assert!(rec_l.flags().contains(Flags::FIRST_SEGMENT));
        assert!(rec_r.flags().contains(Flags::LAST_SEGMENT));
        assert!(rec_r.flags().contains(Flags::REVERSE_COMPLEMENTED));
        assert!(rec_l.flags().contains(Flags::MATE_REVERSE_COMPLEMENTED));
        assert!(!rec_r.flags().contains(Flags::MATE_REVERSE_COMPLEMENTED));

        assert_eq!(rec_l.template_length(), 250);
        assert_eq!(rec_r.template_length(), -250);
        assert_eq!(rec_l.mate_reference_sequence_id(), Some(0));
        assert_eq!(rec_l.mate_alignment_start(), Position::new(301));
        assert_eq!(rec_r.mate_alignment_start(), Position::new(101));
    }

    #[test]
    fn test_paired_end_one_mate_in_insertion() {
        let reference = b"AAAACCCCGGGGTTTT";
        let pos_map = insertion_pos_map();
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        // Left mate on solid sequence, right mate inside the insertion.
        let (rec_l, rec_r) = builder
            .build_paired_end(
                &info(0, true, 4),
                b"AAAA",
                &[40; 4],
                &info(8, false, 4),
                b"NNNN",
                &[40; 4],
                "sim.7",
            )
            .unwrap();

        assert!(!rec_l.flags().contains(Flags::UNMAPPED));
        assert!(rec_l.flags().contains(Flags::MATE_UNMAPPED));
        assert!(rec_r.flags().contains(Flags::UNMAPPED));
        assert_eq!(tag_char(&rec_r, unmapped_reason_tag()), b'I');

        // The unmapped mate borrows its partner's coordinates.
        assert_eq!(rec_r.reference_sequence_id(), Some(0));
        assert_eq!(rec_r.alignment_start(), rec_l.alignment_start());
        assert_eq!(rec_l.template_length(), 0);
        assert_eq!(rec_r.template_length(), 0);
    }

    #[test]
    fn test_paired_end_both_unmapped() {
        let reference = b"AAAACCCCGGGGTTTT";
        let pos_map = insertion_pos_map();
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        let (rec_l, rec_r) = builder
            .build_paired_end(
                &info(8, true, 2),
                b"NN",
                &[40; 2],
                &info(9, false, 2),
                b"NN",
                &[40; 2],
                "sim.8",
            )
            .unwrap();

        for rec in [&rec_l, &rec_r] {
            assert!(rec.flags().contains(Flags::UNMAPPED));
            assert!(rec.flags().contains(Flags::MATE_UNMAPPED));
            assert!(rec.flags().contains(Flags::SEGMENTED));
        }
    }

    #[test]
    fn test_read_with_sequencing_error_gets_md_and_nm() {
        let reference = b"ACGTACGTACGTACGT";
        let pos_map = PositionMap::identity(16);
        let builder = RecordBuilder::new(&pos_map, "chr1", reference, 0, 0);

        // Read of [0, 8) with a substitution at offset 3 (T -> A).
        let record = builder
            .build_single_end(&info(0, true, 8), b"ACGAACGT", &[40; 8], "sim.9")
            .unwrap();

        assert_eq!(tag_i32(&record, nm_tag()), 1);
        assert_eq!(tag_string(&record, md_tag()), "3T4");
        assert_eq!(cigar_string(&record), "8M");
    }
}
