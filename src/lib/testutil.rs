//! Shared fixtures for unit and integration tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes a FASTA file plus a matching FAI index into `dir` and returns the
/// FASTA path. Each contig is written on a single line.
pub fn write_indexed_fasta(dir: &Path, name: &str, contigs: &[(&str, &str)]) -> PathBuf {
    let fasta_path = dir.join(name);
    let mut fasta = File::create(&fasta_path).unwrap();
    let mut fai = File::create(format!("{}.fai", fasta_path.display())).unwrap();
    let mut offset = 0u64;
    for (contig, seq) in contigs {
        let header = format!(">{contig}\n");
        offset += header.len() as u64;
        writeln!(fasta, ">{contig}").unwrap();
        writeln!(fasta, "{seq}").unwrap();
        writeln!(fai, "{}\t{}\t{}\t{}\t{}", contig, seq.len(), offset, seq.len(), seq.len() + 1)
            .unwrap();
        offset += seq.len() as u64 + 1;
    }
    fasta_path
}

/// Writes a minimal VCF file with the given record lines and one sample.
///
/// Record lines are raw tab-separated strings following
/// `CHROM POS ID REF ALT QUAL FILTER INFO FORMAT SAMPLE`.
pub fn write_vcf(dir: &Path, name: &str, contigs: &[(&str, usize)], records: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut vcf = File::create(&path).unwrap();
    writeln!(vcf, "##fileformat=VCFv4.2").unwrap();
    for (contig, len) in contigs {
        writeln!(vcf, "##contig=<ID={contig},length={len}>").unwrap();
    }
    writeln!(vcf, "##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position\">").unwrap();
    writeln!(vcf, "##INFO=<ID=SVLEN,Number=1,Type=Integer,Description=\"SV length\">").unwrap();
    writeln!(vcf, "##INFO=<ID=SEQ,Number=1,Type=String,Description=\"Inserted sequence\">")
        .unwrap();
    writeln!(vcf, "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">").unwrap();
    writeln!(vcf, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE").unwrap();
    for record in records {
        writeln!(vcf, "{record}").unwrap();
    }
    path
}
