//! Variant handling: VCF records, haplotype materialization, and the
//! coordinate maps connecting the materialized, small-variant, and original
//! reference spaces.

pub mod materializer;
pub mod pos_map;
pub mod record;

pub use materializer::VcfMaterializer;
pub use pos_map::{GenomicInterval, IntervalKind, PositionMap, Strand};
pub use record::{SmallVariant, StructuralVariant, VariantSet};
