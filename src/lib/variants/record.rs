//! Variant records read from a VCF file, split by haplotype and class.
//!
//! Records are partitioned into small variants (SNVs and short indels,
//! applied in the first materialization pass) and structural variants
//! (deletions, insertions, inversions, applied in the second pass).
//! Haplotype assignment comes from the first sample's GT field; records
//! without genotypes apply to every haplotype.

use crate::errors::SimError;
use anyhow::{Context, Result};
use noodles::vcf::{
    self,
    variant::record::info::field::Value as InfoValue,
    variant::record::samples::keys::key,
    variant::record::samples::series::Value as SampleValue,
    variant::record::samples::Sample,
    variant::record::AlternateBases,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Sequence alleles at least this much longer or shorter than REF are
/// treated as structural variants.
const SV_LENGTH_THRESHOLD: usize = 50;

/// A small variant on the original reference, 0-based coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmallVariant {
    /// Single-base substitution at `pos`.
    Snv {
        pos: usize,
        ref_base: u8,
        alt: u8,
    },
    /// Bases inserted immediately before original position `pos`.
    Insertion {
        pos: usize,
        seq: Vec<u8>,
    },
    /// Deletion of original positions `[pos, pos + ref_seq.len())`.
    Deletion {
        pos: usize,
        ref_seq: Vec<u8>,
    },
}

impl SmallVariant {
    /// Position the variant acts on, for sorting and overlap checks.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Snv { pos, .. } | Self::Insertion { pos, .. } | Self::Deletion { pos, .. } => {
                *pos
            }
        }
    }
}

/// A structural variant on the original reference, 0-based coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralVariant {
    /// Deletion of `[begin, end)`.
    Deletion { begin: usize, end: usize },
    /// Sequence inserted immediately before `pos`.
    Insertion { pos: usize, seq: Vec<u8> },
    /// Inversion of `[begin, end)`.
    Inversion { begin: usize, end: usize },
}

impl StructuralVariant {
    /// Begin of the affected region, for sorting.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Deletion { begin, .. } | Self::Inversion { begin, .. } => *begin,
            Self::Insertion { pos, .. } => *pos,
        }
    }
}

/// Variants of one contig, indexed by haplotype.
#[derive(Debug, Clone, Default)]
pub struct ContigVariants {
    /// Small variants per haplotype, sorted by position.
    pub small: Vec<Vec<SmallVariant>>,
    /// Structural variants per haplotype, sorted by position.
    pub structural: Vec<Vec<StructuralVariant>>,
}

impl ContigVariants {
    fn with_haplotypes(n: usize) -> Self {
        Self { small: vec![Vec::new(); n], structural: vec![Vec::new(); n] }
    }
}

/// All variants of a VCF file, ready for materialization.
#[derive(Debug, Clone)]
pub struct VariantSet {
    /// Number of haplotypes (maximum GT ploidy seen, at least 1).
    pub num_haplotypes: usize,
    /// Contig names from the VCF header, in declaration order.
    pub contig_names: Vec<String>,
    by_contig: HashMap<String, ContigVariants>,
}

impl VariantSet {
    /// Variants for a contig, if the VCF mentions it.
    #[must_use]
    pub fn for_contig(&self, name: &str) -> Option<&ContigVariants> {
        self.by_contig.get(name)
    }

    /// Contig names carrying at least one record.
    pub fn contigs_with_records(&self) -> impl Iterator<Item = &String> {
        self.by_contig.keys()
    }

    /// Reads and classifies all records of a VCF file.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, malformed records, unsupported
    /// symbolic alleles, or records that overlap a previous record on the
    /// same haplotype.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open variants file: {}", path.display()))?;
        let mut reader = vcf::io::Reader::new(BufReader::new(file));
        let header = reader.read_header().context("Failed to read VCF header")?;

        let contig_names: Vec<String> =
            header.contigs().keys().map(|name| name.to_string()).collect();

        // First pass over parsed rows to learn the ploidy, collecting raw
        // per-record data as we go.
        let mut rows: Vec<RawRecord> = Vec::new();
        let mut num_haplotypes = 1;
        for result in reader.records() {
            let record = result.context("Failed to read VCF record")?;
            let row = RawRecord::parse(&record, &header)?;
            if let Some(indices) = &row.genotype {
                num_haplotypes = num_haplotypes.max(indices.len());
            }
            rows.push(row);
        }

        let mut by_contig: HashMap<String, ContigVariants> = HashMap::new();
        for row in rows {
            let entry = by_contig
                .entry(row.contig.clone())
                .or_insert_with(|| ContigVariants::with_haplotypes(num_haplotypes));
            row.classify(num_haplotypes, entry)?;
        }

        for variants in by_contig.values_mut() {
            for hap in &mut variants.small {
                hap.sort_by_key(SmallVariant::position);
            }
            for hap in &mut variants.structural {
                hap.sort_by_key(StructuralVariant::position);
            }
        }

        Ok(Self { num_haplotypes, contig_names, by_contig })
    }
}

/// One VCF row, decoded but not yet classified.
struct RawRecord {
    contig: String,
    /// 0-based variant position.
    pos: usize,
    ref_bases: Vec<u8>,
    alts: Vec<String>,
    /// Allele index per haplotype, when a GT field is present.
    genotype: Option<Vec<usize>>,
    /// INFO END, converted to a 0-based exclusive end.
    end: Option<usize>,
    /// INFO SVLEN, absolute value.
    sv_len: Option<usize>,
    /// INFO SEQ for symbolic insertions.
    ins_seq: Option<Vec<u8>>,
}

impl RawRecord {
    fn parse(record: &vcf::Record, header: &vcf::Header) -> Result<Self> {
        let contig = record.reference_sequence_name().to_string();
        let pos = match record.variant_start() {
            Some(result) => usize::from(result?) - 1,
            None => {
                return Err(SimError::InconsistentVariant {
                    contig,
                    position: 0,
                    reason: "record has no position".to_string(),
                }
                .into())
            }
        };

        let ref_bases = record.reference_bases().as_bytes().to_ascii_uppercase();
        let mut alts = Vec::new();
        for alt in record.alternate_bases().iter() {
            alts.push(alt?.to_ascii_uppercase());
        }

        let genotype = genotype_allele_indices(record, header)?;
        let end = match info_integer(record, header, "END")? {
            // VCF END is 1-based inclusive, which equals a 0-based exclusive end.
            Some(end) => Some(end as usize),
            None => None,
        };
        let sv_len = info_integer(record, header, "SVLEN")?.map(|v| v.unsigned_abs() as usize);
        let ins_seq = info_string(record, header, "SEQ")?.map(|s| s.into_bytes());

        Ok(Self { contig, pos, ref_bases, alts, genotype, end, sv_len, ins_seq })
    }

    /// Classifies this row into per-haplotype small/structural variants.
    fn classify(self, num_haplotypes: usize, out: &mut ContigVariants) -> Result<()> {
        for hap in 0..num_haplotypes {
            let allele = match &self.genotype {
                Some(indices) => indices.get(hap).copied().unwrap_or(0),
                // No genotype: the record applies to every haplotype.
                None => 1,
            };
            if allele == 0 {
                continue;
            }
            let Some(alt) = self.alts.get(allele - 1) else {
                return Err(self.inconsistent(format!(
                    "GT references allele {allele} but the record has {} ALT(s)",
                    self.alts.len()
                )));
            };

            if let Some(symbol) = alt.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                out.structural[hap].push(self.symbolic(symbol)?);
            } else {
                self.sequence_alleles(alt.as_bytes(), hap, out)?;
            }
        }
        Ok(())
    }

    /// Decodes a symbolic ALT allele.
    fn symbolic(&self, symbol: &str) -> Result<StructuralVariant> {
        let region_end = || -> Result<usize> {
            if let Some(end) = self.end {
                if end <= self.pos + 1 {
                    return Err(self.inconsistent("END does not follow POS".to_string()));
                }
                return Ok(end);
            }
            if let Some(len) = self.sv_len {
                return Ok(self.pos + 1 + len);
            }
            Err(self.inconsistent(format!("symbolic <{symbol}> needs END or SVLEN")))
        };

        match symbol {
            // POS anchors the base before the event.
            "DEL" => Ok(StructuralVariant::Deletion { begin: self.pos + 1, end: region_end()? }),
            "INV" => Ok(StructuralVariant::Inversion { begin: self.pos + 1, end: region_end()? }),
            "INS" => {
                let seq = self
                    .ins_seq
                    .clone()
                    .ok_or_else(|| self.inconsistent("symbolic <INS> needs SEQ".to_string()))?;
                Ok(StructuralVariant::Insertion { pos: self.pos + 1, seq })
            }
            other => Err(self.inconsistent(format!("unsupported symbolic allele <{other}>"))),
        }
    }

    /// Decodes a plain sequence REF/ALT pair into small or structural
    /// variants for one haplotype.
    fn sequence_alleles(&self, alt: &[u8], hap: usize, out: &mut ContigVariants) -> Result<()> {
        let ref_bases = &self.ref_bases;
        if ref_bases.is_empty() || alt.is_empty() {
            return Err(self.inconsistent("empty REF or ALT allele".to_string()));
        }

        if ref_bases.len() == alt.len() {
            // SNV or MNV: one substitution per differing base.
            for (i, (&r, &a)) in ref_bases.iter().zip(alt.iter()).enumerate() {
                if r != a {
                    out.small[hap].push(SmallVariant::Snv {
                        pos: self.pos + i,
                        ref_base: r,
                        alt: a,
                    });
                }
            }
            return Ok(());
        }

        // Indel: both alleles share the anchor base by VCF convention.
        if ref_bases[0] != alt[0] {
            return Err(self.inconsistent("indel alleles do not share an anchor base".to_string()));
        }

        if ref_bases.len() < alt.len() {
            let seq = alt[ref_bases.len()..].to_vec();
            if alt[..ref_bases.len()] != ref_bases[..] {
                return Err(self.inconsistent("ALT does not extend REF".to_string()));
            }
            let pos = self.pos + ref_bases.len();
            if seq.len() >= SV_LENGTH_THRESHOLD {
                out.structural[hap].push(StructuralVariant::Insertion { pos, seq });
            } else {
                out.small[hap].push(SmallVariant::Insertion { pos, seq });
            }
        } else {
            let deleted = ref_bases[alt.len()..].to_vec();
            if ref_bases[..alt.len()] != alt[..] {
                return Err(self.inconsistent("REF does not extend ALT".to_string()));
            }
            let pos = self.pos + alt.len();
            if deleted.len() >= SV_LENGTH_THRESHOLD {
                out.structural[hap]
                    .push(StructuralVariant::Deletion { begin: pos, end: pos + deleted.len() });
            } else {
                out.small[hap].push(SmallVariant::Deletion { pos, ref_seq: deleted });
            }
        }
        Ok(())
    }

    fn inconsistent(&self, reason: String) -> anyhow::Error {
        SimError::InconsistentVariant { contig: self.contig.clone(), position: self.pos + 1, reason }
            .into()
    }
}

/// Extracts the allele indices of the first sample's GT field.
fn genotype_allele_indices(
    record: &vcf::Record,
    header: &vcf::Header,
) -> Result<Option<Vec<usize>>> {
    let samples = record.samples();
    let Some(sample) = samples.iter().next() else {
        return Ok(None);
    };
    let value = match sample.get(header, key::GENOTYPE) {
        Some(Ok(Some(value))) => value,
        Some(Err(e)) => return Err(e).context("Failed to parse GT field"),
        _ => return Ok(None),
    };
    let SampleValue::Genotype(genotype) = value else {
        return Ok(None);
    };
    let mut indices = Vec::new();
    for result in genotype.iter() {
        let (allele, _phasing) = result.context("Failed to parse GT allele")?;
        // A missing allele ('.') falls back to the reference allele.
        indices.push(allele.unwrap_or(0));
    }
    Ok(Some(indices))
}

/// Reads an integer INFO value.
fn info_integer(record: &vcf::Record, header: &vcf::Header, name: &str) -> Result<Option<i32>> {
    match record.info().get(header, name) {
        Some(Ok(Some(InfoValue::Integer(value)))) => Ok(Some(value)),
        Some(Err(e)) => Err(e).with_context(|| format!("Failed to parse INFO {name}")),
        _ => Ok(None),
    }
}

/// Reads a string INFO value.
fn info_string(record: &vcf::Record, header: &vcf::Header, name: &str) -> Result<Option<String>> {
    match record.info().get(header, name) {
        Some(Ok(Some(InfoValue::String(value)))) => Ok(Some(value.to_string())),
        Some(Err(e)) => Err(e).with_context(|| format!("Failed to parse INFO {name}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_vcf;
    use tempfile::TempDir;

    #[test]
    fn test_load_snv_and_indels() {
        let dir = TempDir::new().unwrap();
        let path = write_vcf(
            dir.path(),
            "vars.vcf",
            &[("chr1", 1000)],
            &[
                "chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0|1",
                "chr1\t200\t.\tC\tCTT\t.\t.\t.\tGT\t1|1",
                "chr1\t300\t.\tGAAA\tG\t.\t.\t.\tGT\t1|0",
            ],
        );

        let set = VariantSet::load(&path).unwrap();
        assert_eq!(set.num_haplotypes, 2);
        assert_eq!(set.contig_names, vec!["chr1".to_string()]);

        let contig = set.for_contig("chr1").unwrap();
        // Haplotype 0 carries the insertion and the deletion.
        assert_eq!(
            contig.small[0],
            vec![
                SmallVariant::Insertion { pos: 200, seq: b"TT".to_vec() },
                SmallVariant::Deletion { pos: 300, ref_seq: b"AAA".to_vec() },
            ]
        );
        // Haplotype 1 carries the SNV and the insertion.
        assert_eq!(
            contig.small[1],
            vec![
                SmallVariant::Snv { pos: 99, ref_base: b'A', alt: b'G' },
                SmallVariant::Insertion { pos: 200, seq: b"TT".to_vec() },
            ]
        );
        assert!(contig.structural[0].is_empty());
        assert!(contig.structural[1].is_empty());
    }

    #[test]
    fn test_load_symbolic_svs() {
        let dir = TempDir::new().unwrap();
        let path = write_vcf(
            dir.path(),
            "vars.vcf",
            &[("chr1", 10_000)],
            &[
                "chr1\t1000\t.\tA\t<DEL>\t.\t.\tEND=1500\tGT\t1",
                "chr1\t2000\t.\tC\t<INV>\t.\t.\tSVLEN=300\tGT\t1",
                "chr1\t3000\t.\tG\t<INS>\t.\t.\tSEQ=ACGTACGT\tGT\t1",
            ],
        );

        let set = VariantSet::load(&path).unwrap();
        assert_eq!(set.num_haplotypes, 1);
        let contig = set.for_contig("chr1").unwrap();
        assert_eq!(
            contig.structural[0],
            vec![
                StructuralVariant::Deletion { begin: 1000, end: 1500 },
                StructuralVariant::Inversion { begin: 2000, end: 2300 },
                StructuralVariant::Insertion { pos: 3000, seq: b"ACGTACGT".to_vec() },
            ]
        );
    }

    #[test]
    fn test_no_genotype_applies_everywhere() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vars.vcf");
        std::fs::write(
            &path,
            "##fileformat=VCFv4.2\n\
             ##contig=<ID=chr1,length=1000>\n\
             #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
             chr1\t10\t.\tA\tT\t.\t.\t.\n",
        )
        .unwrap();

        let set = VariantSet::load(&path).unwrap();
        assert_eq!(set.num_haplotypes, 1);
        let contig = set.for_contig("chr1").unwrap();
        assert_eq!(
            contig.small[0],
            vec![SmallVariant::Snv { pos: 9, ref_base: b'A', alt: b'T' }]
        );
    }

    #[test]
    fn test_unsupported_symbolic_allele() {
        let dir = TempDir::new().unwrap();
        let path = write_vcf(
            dir.path(),
            "vars.vcf",
            &[("chr1", 10_000)],
            &["chr1\t1000\t.\tA\t<DUP>\t.\t.\tEND=1500\tGT\t1"],
        );
        let err = VariantSet::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported symbolic allele"));
    }

    #[test]
    fn test_long_indel_is_structural() {
        let insert: String = "ACGT".repeat(20);
        let record = format!("chr1\t100\t.\tA\tA{insert}\t.\t.\t.\tGT\t1");
        let dir = TempDir::new().unwrap();
        let path = write_vcf(dir.path(), "vars.vcf", &[("chr1", 1000)], &[&record]);

        let set = VariantSet::load(&path).unwrap();
        let contig = set.for_contig("chr1").unwrap();
        assert!(contig.small[0].is_empty());
        assert_eq!(
            contig.structural[0],
            vec![StructuralVariant::Insertion { pos: 100, seq: insert.into_bytes() }]
        );
    }

    #[test]
    fn test_mnv_becomes_snvs() {
        let dir = TempDir::new().unwrap();
        let path = write_vcf(
            dir.path(),
            "vars.vcf",
            &[("chr1", 1000)],
            &["chr1\t50\t.\tACG\tATG\t.\t.\t.\tGT\t1"],
        );
        let set = VariantSet::load(&path).unwrap();
        let contig = set.for_contig("chr1").unwrap();
        assert_eq!(
            contig.small[0],
            vec![SmallVariant::Snv { pos: 50, ref_base: b'C', alt: b'T' }]
        );
    }
}
