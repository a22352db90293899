#![deny(unsafe_code)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # fgsim - sequencing-read simulation library
//!
//! This library implements a variant-aware read simulator: a fixed number of
//! fragments is distributed across the contigs and haplotypes of a reference
//! genome, each haplotype is materialized from a VCF, reads are synthesized
//! under an Illumina-style error model, and every read's true alignment
//! against the original reference is reconstructed by banded realignment.
//!
//! ## Module map
//!
//! - **[`pipeline`]** - the distribute/simulate/join orchestrator
//! - **[`variants`]** - VCF reading, haplotype materialization, and the
//!   three-way coordinate maps
//! - **[`simulate`]** - fragment sampling, the sequencing-simulator seam,
//!   the Illumina model, and per-thread workers
//! - **[`align`]** - banded global realignment, CIGAR and MD extraction
//! - **[`sam`]** - true-alignment record builders and header assembly
//! - **[`splitter`]** - per-bucket spill files and their readback
//! - **[`reference`]**, **[`methylation`]**, **[`fastq`]** - input/output
//!   plumbing
//!
//! ## Quick start
//!
//! ```no_run
//! use fgsim_lib::pipeline::{PipelineConfig, SimulatorPipeline};
//! use fgsim_lib::simulate::fragment::FragmentSampler;
//! use fgsim_lib::simulate::illumina::IlluminaSimulator;
//! use fgsim_lib::variants::materializer::VcfMaterializer;
//!
//! # fn main() -> anyhow::Result<()> {
//! let materializer = VcfMaterializer::new("ref.fa".as_ref(), None, None)?;
//! let config = PipelineConfig {
//!     num_fragments: 1000,
//!     num_threads: 4,
//!     chunk_size: 65536,
//!     seed: 0,
//!     seed_spacing: 2048,
//!     read_name_prefix: "simulated.".to_string(),
//!     embed_read_info: false,
//!     out_left: "left.fq".into(),
//!     out_right: Some("right.fq".into()),
//!     out_sam: Some("truth.sam".into()),
//!     force_single_end: false,
//!     sampler: FragmentSampler::default(),
//!     simulator: IlluminaSimulator::default(),
//! };
//! SimulatorPipeline::new(config, materializer).run()?;
//! # Ok(())
//! # }
//! ```

pub mod align;
pub mod dna;
pub mod errors;
pub mod fastq;
pub mod methylation;
pub mod pipeline;
pub mod progress;
pub mod reference;
pub mod sam;
pub mod simulate;
pub mod splitter;
pub mod variants;

#[doc(hidden)]
pub mod testutil;

pub use errors::SimError;
