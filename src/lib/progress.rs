//! Progress logging for the simulation phase.
//!
//! One tracker covers one (contig, haplotype) pair: chunk completions are
//! logged at `debug`, the per-contig fragment total at `info`, and the
//! pipeline prints a final summary across all pairs.

use log::{debug, info};

/// Chunk and fragment accounting for one (contig, haplotype) pair.
pub struct ContigProgress {
    label: String,
    chunks: u64,
    fragments: u64,
}

impl ContigProgress {
    /// Starts tracking and announces the contig.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("Simulating {label}");
        Self { label, chunks: 0, fragments: 0 }
    }

    /// Records one completed worker chunk of `fragments` fragments.
    pub fn add_chunk(&mut self, fragments: u64) {
        self.chunks += 1;
        self.fragments += fragments;
        debug!("{}: chunk {} done ({} fragments so far)", self.label, self.chunks, self.fragments);
    }

    /// Fragments seen so far.
    #[must_use]
    pub fn fragments(&self) -> u64 {
        self.fragments
    }

    /// Logs the per-contig total and returns it.
    pub fn finish(self) -> u64 {
        info!("  {} done ({} fragments)", self.label, self.fragments);
        self.fragments
    }
}

/// Logs the end-of-run per-contig fragment summary.
pub fn log_summary(counts: &[(String, u64)]) {
    info!("Fragment counts per contig:");
    let mut total = 0;
    for (label, count) in counts {
        info!("  {label}: {count}");
        total += count;
    }
    info!("  total: {total}");
}
