//! Fragment interval sampling over a materialized haplotype.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// An interval `[begin, end)` on a haplotype's materialized sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub begin: usize,
    pub end: usize,
}

impl Fragment {
    /// Fragment length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the fragment is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }
}

/// Shape of the fragment length distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthModel {
    /// Normal distribution around `mean` with `stddev`, clamped to
    /// `[min_len, max_len]`.
    Normal,
    /// Uniform over `[min_len, max_len]`.
    Uniform,
}

/// Samples fragment intervals with configurable length distribution and
/// uniform placement.
#[derive(Debug, Clone)]
pub struct FragmentSampler {
    /// Minimum fragment length (hard floor).
    pub min_len: usize,
    /// Maximum fragment length (hard ceiling).
    pub max_len: usize,
    /// Mean fragment length (normal model).
    pub mean: f64,
    /// Fragment length standard deviation (normal model).
    pub stddev: f64,
    /// Length distribution shape.
    pub model: LengthModel,
}

impl Default for FragmentSampler {
    fn default() -> Self {
        Self { min_len: 100, max_len: 400, mean: 300.0, stddev: 30.0, model: LengthModel::Normal }
    }
}

impl FragmentSampler {
    /// Samples one fragment length.
    fn sample_len(&self, rng: &mut StdRng) -> usize {
        match self.model {
            LengthModel::Normal => {
                let dist = Normal::new(self.mean, self.stddev)
                    .expect("fragment length stddev must be finite and non-negative");
                (dist.sample(rng).round() as usize).clamp(self.min_len, self.max_len)
            }
            LengthModel::Uniform => rng.random_range(self.min_len..=self.max_len),
        }
    }

    /// Fills `out` with `n` fragments on a contig of `contig_len` bases.
    ///
    /// Fragments are independent; no deduplication. A contig shorter than
    /// the minimum fragment length yields zero fragments.
    pub fn generate_many(
        &self,
        out: &mut Vec<Fragment>,
        rng: &mut StdRng,
        contig_len: usize,
        n: usize,
    ) {
        out.clear();
        if contig_len < self.min_len {
            return;
        }
        out.reserve(n);
        for _ in 0..n {
            let len = self.sample_len(rng).min(contig_len);
            let begin = rng.random_range(0..=contig_len - len);
            out.push(Fragment { begin, end: begin + len });
        }
    }
}
