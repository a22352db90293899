//! The `simulate` command: reads and true alignments from a reference
//! genome plus an optional variant catalogue.

use crate::commands::command::Command;
use anyhow::{bail, Result};
use clap::{Args, Parser};
use fgsim_lib::pipeline::{PipelineConfig, SimulatorPipeline};
use fgsim_lib::simulate::fragment::{FragmentSampler, LengthModel};
use fgsim_lib::simulate::illumina::{BisulfiteConfig, IlluminaSimulator};
use fgsim_lib::variants::materializer::VcfMaterializer;
use log::info;
use std::path::PathBuf;

/// Simulate sequencing reads from a reference genome.
#[derive(Parser, Debug)]
#[command(
    name = "simulate",
    about = "Simulate reads with optional variants and truth alignments",
    long_about = r#"
Simulate single-end or paired-end sequencing reads from an indexed reference
FASTA, optionally materializing haplotypes from a VCF first. With
--out-alignments, a SAM file records every read's true position, orientation,
edit distance, and alignment against the original reference.

Paired-end mode is enabled by --out-right; left mates go to --out, right
mates to --out-right, with pairs on corresponding lines.
"#
)]
pub struct Simulate {
    /// Indexed reference FASTA file
    #[arg(short = 'r', long = "reference", required = true)]
    pub reference: PathBuf,

    /// VCF file with variants to apply to the reference
    #[arg(short = 'v', long = "variants")]
    pub variants: Option<PathBuf>,

    /// Number of fragments to simulate
    #[arg(short = 'n', long = "num-fragments", default_value = "1000")]
    pub num_fragments: usize,

    /// Number of worker threads
    #[arg(short = 't', long = "threads", default_value = "1")]
    pub threads: usize,

    /// Fragments dispatched to one worker per round
    #[arg(long = "chunk-size", default_value = "65536")]
    pub chunk_size: usize,

    /// Base RNG seed
    #[arg(long = "seed", default_value = "0")]
    pub seed: u64,

    /// Seed distance between worker RNGs
    #[arg(long = "seed-spacing", default_value = "2048")]
    pub seed_spacing: u64,

    /// Prefix for read names
    #[arg(long = "read-name-prefix", default_value = "simulated.")]
    pub read_name_prefix: String,

    /// Append the simulation origin to FASTQ read names
    #[arg(long = "embed-read-info")]
    pub embed_read_info: bool,

    /// Left (or single-end) FASTQ output; .gz enables compression
    #[arg(short = 'o', long = "out", required = true)]
    pub out: PathBuf,

    /// Right-mate FASTQ output; enables paired-end simulation
    #[arg(long = "out-right")]
    pub out_right: Option<PathBuf>,

    /// SAM output with the true alignments
    #[arg(long = "out-alignments")]
    pub out_alignments: Option<PathBuf>,

    /// Simulate single-end reads even when --out-right is given
    #[arg(long = "force-single-end")]
    pub force_single_end: bool,

    /// Methylation level FASTA (records <contig>/TOP and <contig>/BOT)
    #[arg(long = "methylation-fasta")]
    pub methylation_fasta: Option<PathBuf>,

    /// Simulate bisulfite treatment using the methylation levels
    #[arg(long = "enable-bs-seq")]
    pub enable_bs_seq: bool,

    /// Conversion rate for unmethylated cytosines in bisulfite mode
    #[arg(long = "bs-conversion-rate", default_value = "0.99")]
    pub bs_conversion_rate: f64,

    #[command(flatten)]
    pub fragment: FragmentArgs,

    #[command(flatten)]
    pub illumina: IlluminaArgs,
}

/// Fragment size distribution options.
#[derive(Args, Debug, Clone)]
pub struct FragmentArgs {
    /// Mean fragment length (normal distribution)
    #[arg(long = "fragment-mean", default_value = "300.0")]
    pub fragment_mean: f64,

    /// Fragment length standard deviation (normal distribution)
    #[arg(long = "fragment-stddev", default_value = "30.0")]
    pub fragment_stddev: f64,

    /// Minimum fragment length
    #[arg(long = "fragment-min", default_value = "100")]
    pub fragment_min: usize,

    /// Maximum fragment length
    #[arg(long = "fragment-max", default_value = "400")]
    pub fragment_max: usize,

    /// Length distribution: "normal" or "uniform"
    #[arg(long = "fragment-distribution", default_value = "normal")]
    pub fragment_distribution: String,
}

impl FragmentArgs {
    /// Convert to a [`FragmentSampler`].
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown distribution name.
    pub fn to_sampler(&self) -> Result<FragmentSampler> {
        let model = match self.fragment_distribution.as_str() {
            "normal" => LengthModel::Normal,
            "uniform" => LengthModel::Uniform,
            other => bail!("Unknown fragment distribution '{other}' (use normal or uniform)"),
        };
        if self.fragment_min == 0 || self.fragment_min > self.fragment_max {
            bail!(
                "Invalid fragment length range [{}, {}]",
                self.fragment_min,
                self.fragment_max
            );
        }
        if !self.fragment_stddev.is_finite() || self.fragment_stddev < 0.0 {
            bail!("Invalid fragment length standard deviation {}", self.fragment_stddev);
        }
        Ok(FragmentSampler {
            min_len: self.fragment_min,
            max_len: self.fragment_max,
            mean: self.fragment_mean,
            stddev: self.fragment_stddev,
            model,
        })
    }
}

/// Illumina error-model options.
#[derive(Args, Debug, Clone)]
pub struct IlluminaArgs {
    /// Read length in bases
    #[arg(short = 'l', long = "read-length", default_value = "100")]
    pub read_length: usize,

    /// Substitution probability at the first base
    #[arg(long = "prob-mismatch-begin", default_value = "0.002")]
    pub prob_mismatch_begin: f64,

    /// Substitution probability at the last base
    #[arg(long = "prob-mismatch-end", default_value = "0.012")]
    pub prob_mismatch_end: f64,

    /// Per-position insertion probability
    #[arg(long = "prob-insertion", default_value = "0.001")]
    pub prob_insertion: f64,

    /// Per-position deletion probability
    #[arg(long = "prob-deletion", default_value = "0.001")]
    pub prob_deletion: f64,

    /// Mean quality at the first base
    #[arg(long = "quality-mean-begin", default_value = "40.0")]
    pub quality_mean_begin: f64,

    /// Mean quality at the last base
    #[arg(long = "quality-mean-end", default_value = "39.5")]
    pub quality_mean_end: f64,

    /// Quality standard deviation at the first base
    #[arg(long = "quality-stddev-begin", default_value = "0.05")]
    pub quality_stddev_begin: f64,

    /// Quality standard deviation at the last base
    #[arg(long = "quality-stddev-end", default_value = "10.0")]
    pub quality_stddev_end: f64,

    /// Mean quality of error bases at the first base
    #[arg(long = "mismatch-quality-mean-begin", default_value = "39.5")]
    pub mismatch_quality_mean_begin: f64,

    /// Mean quality of error bases at the last base
    #[arg(long = "mismatch-quality-mean-end", default_value = "30.0")]
    pub mismatch_quality_mean_end: f64,

    /// Error-base quality standard deviation at the first base
    #[arg(long = "mismatch-quality-stddev-begin", default_value = "3.0")]
    pub mismatch_quality_stddev_begin: f64,

    /// Error-base quality standard deviation at the last base
    #[arg(long = "mismatch-quality-stddev-end", default_value = "15.0")]
    pub mismatch_quality_stddev_end: f64,
}

impl IlluminaArgs {
    /// Convert to an [`IlluminaSimulator`].
    ///
    /// # Errors
    ///
    /// Returns an error when an error probability lies outside `[0, 1]` or
    /// a quality standard deviation is negative or non-finite.
    pub fn to_simulator(&self, bisulfite: Option<BisulfiteConfig>) -> Result<IlluminaSimulator> {
        for (name, value) in [
            ("--prob-mismatch-begin", self.prob_mismatch_begin),
            ("--prob-mismatch-end", self.prob_mismatch_end),
            ("--prob-insertion", self.prob_insertion),
            ("--prob-deletion", self.prob_deletion),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                bail!("{name} must be a probability in [0, 1], got {value}");
            }
        }
        for (name, value) in [
            ("--quality-stddev-begin", self.quality_stddev_begin),
            ("--quality-stddev-end", self.quality_stddev_end),
            ("--mismatch-quality-stddev-begin", self.mismatch_quality_stddev_begin),
            ("--mismatch-quality-stddev-end", self.mismatch_quality_stddev_end),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be finite and non-negative, got {value}");
            }
        }

        Ok(IlluminaSimulator {
            read_length: self.read_length,
            prob_mismatch_begin: self.prob_mismatch_begin,
            prob_mismatch_end: self.prob_mismatch_end,
            prob_insertion: self.prob_insertion,
            prob_deletion: self.prob_deletion,
            mean_quality_begin: self.quality_mean_begin,
            mean_quality_end: self.quality_mean_end,
            stddev_quality_begin: self.quality_stddev_begin,
            stddev_quality_end: self.quality_stddev_end,
            mean_mismatch_quality_begin: self.mismatch_quality_mean_begin,
            mean_mismatch_quality_end: self.mismatch_quality_mean_end,
            stddev_mismatch_quality_begin: self.mismatch_quality_stddev_begin,
            stddev_mismatch_quality_end: self.mismatch_quality_stddev_end,
            bisulfite,
        })
    }
}

impl Command for Simulate {
    fn execute(&self, _command_line: &str) -> Result<()> {
        if self.enable_bs_seq && self.methylation_fasta.is_none() {
            bail!("--enable-bs-seq requires --methylation-fasta");
        }
        if self.illumina.read_length == 0 {
            bail!("--read-length must be at least 1");
        }
        if self.chunk_size == 0 {
            bail!("--chunk-size must be at least 1");
        }
        if self.force_single_end && self.out_right.is_none() && self.out_alignments.is_none() {
            // Harmless, but worth telling the user their flag is inert.
            info!("--force-single-end has no effect without --out-right");
        }

        info!("Simulating reads");
        info!("  Reference: {}", self.reference.display());
        if let Some(path) = &self.variants {
            info!("  Variants: {}", path.display());
        }
        info!("  Num fragments: {}", self.num_fragments);
        info!("  Threads: {}", self.threads);
        info!("  Seed: {} (spacing {})", self.seed, self.seed_spacing);
        info!("  Output: {}", self.out.display());
        if let Some(path) = &self.out_right {
            info!("  Output (right mates): {}", path.display());
        }
        if let Some(path) = &self.out_alignments {
            info!("  Output (alignments): {}", path.display());
        }

        let bisulfite = self
            .enable_bs_seq
            .then(|| BisulfiteConfig { conversion_rate: self.bs_conversion_rate });

        let materializer = VcfMaterializer::new(
            &self.reference,
            self.variants.as_deref(),
            self.methylation_fasta.as_deref(),
        )?;

        let config = PipelineConfig {
            num_fragments: self.num_fragments,
            num_threads: self.threads,
            chunk_size: self.chunk_size,
            seed: self.seed,
            seed_spacing: self.seed_spacing,
            read_name_prefix: self.read_name_prefix.clone(),
            embed_read_info: self.embed_read_info,
            out_left: self.out.clone(),
            out_right: self.out_right.clone(),
            out_sam: self.out_alignments.clone(),
            force_single_end: self.force_single_end,
            sampler: self.fragment.to_sampler()?,
            simulator: self.illumina.to_simulator(bisulfite)?,
        };

        SimulatorPipeline::new(config, materializer).run()
    }
}
