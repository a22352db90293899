//! Illumina-style base-call simulation.
//!
//! Models position-dependent substitution rates (ramping linearly from the
//! start to the end of the read), independent short indels, and qualities
//! drawn from position-interpolated normal distributions with a separate,
//! lower quality profile for error bases. With methylation levels present
//! and bisulfite mode enabled, unconverted-cytosine chemistry is applied to
//! the template before sequencing errors.

use crate::dna::{random_base, reverse_complement, substitute_base};
use crate::methylation::{level_fraction, MethylationLevels};
use crate::simulate::fragment::Fragment;
use crate::simulate::sequencing::{
    push_op, CigarElement, CigarOp, SequencingSimulationInfo, SequencingSimulator,
};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Bisulfite conversion parameters.
#[derive(Debug, Clone, Copy)]
pub struct BisulfiteConfig {
    /// Probability that an unmethylated cytosine converts.
    pub conversion_rate: f64,
}

impl Default for BisulfiteConfig {
    fn default() -> Self {
        Self { conversion_rate: 0.99 }
    }
}

/// Illumina-style sequencing simulator.
#[derive(Debug, Clone)]
pub struct IlluminaSimulator {
    /// Target read length.
    pub read_length: usize,
    /// Substitution probability at the first base.
    pub prob_mismatch_begin: f64,
    /// Substitution probability at the last base.
    pub prob_mismatch_end: f64,
    /// Per-position insertion probability.
    pub prob_insertion: f64,
    /// Per-position deletion probability.
    pub prob_deletion: f64,
    /// Mean quality at the first base.
    pub mean_quality_begin: f64,
    /// Mean quality at the last base.
    pub mean_quality_end: f64,
    /// Quality standard deviation at the first base.
    pub stddev_quality_begin: f64,
    /// Quality standard deviation at the last base.
    pub stddev_quality_end: f64,
    /// Mean quality of error bases at the first base.
    pub mean_mismatch_quality_begin: f64,
    /// Mean quality of error bases at the last base.
    pub mean_mismatch_quality_end: f64,
    /// Error-base quality standard deviation at the first base.
    pub stddev_mismatch_quality_begin: f64,
    /// Error-base quality standard deviation at the last base.
    pub stddev_mismatch_quality_end: f64,
    /// Bisulfite chemistry, when simulating from methylation levels.
    pub bisulfite: Option<BisulfiteConfig>,
}

impl Default for IlluminaSimulator {
    fn default() -> Self {
        Self {
            read_length: 100,
            prob_mismatch_begin: 0.002,
            prob_mismatch_end: 0.012,
            prob_insertion: 0.001,
            prob_deletion: 0.001,
            mean_quality_begin: 40.0,
            mean_quality_end: 39.5,
            stddev_quality_begin: 0.05,
            stddev_quality_end: 10.0,
            mean_mismatch_quality_begin: 39.5,
            mean_mismatch_quality_end: 30.0,
            stddev_mismatch_quality_begin: 3.0,
            stddev_mismatch_quality_end: 15.0,
            bisulfite: None,
        }
    }
}

impl IlluminaSimulator {
    /// Linear interpolation across read positions.
    fn interpolate(&self, begin: f64, end: f64, pos: usize) -> f64 {
        if self.read_length <= 1 {
            return begin;
        }
        begin + (end - begin) * pos as f64 / (self.read_length - 1) as f64
    }

    /// Draws a quality score for the given read position.
    ///
    /// # Panics
    ///
    /// Panics when the configured standard deviations do not form a valid
    /// normal distribution.
    fn sample_quality(&self, pos: usize, is_error: bool, rng: &mut StdRng) -> u8 {
        let (mean, stddev) = if is_error {
            (
                self.interpolate(
                    self.mean_mismatch_quality_begin,
                    self.mean_mismatch_quality_end,
                    pos,
                ),
                self.interpolate(
                    self.stddev_mismatch_quality_begin,
                    self.stddev_mismatch_quality_end,
                    pos,
                ),
            )
        } else {
            (
                self.interpolate(self.mean_quality_begin, self.mean_quality_end, pos),
                self.interpolate(self.stddev_quality_begin, self.stddev_quality_end, pos),
            )
        };
        let dist = Normal::new(mean, stddev).expect("Invalid quality distribution parameters");
        dist.sample(rng).round().clamp(2.0, 41.0) as u8
    }

    /// Applies bisulfite conversion to a fragment in forward coordinates.
    ///
    /// Reads from the top strand convert unmethylated C to T; reads from the
    /// bottom strand convert unmethylated G to A (a bottom-strand C in
    /// forward coordinates).
    fn bisulfite_convert(
        &self,
        config: BisulfiteConfig,
        fragment: Fragment,
        template: &mut [u8],
        levels: &MethylationLevels,
        top_strand: bool,
        rng: &mut StdRng,
    ) {
        let (target, replacement, track) = if top_strand {
            (b'C', b'T', &levels.top)
        } else {
            (b'G', b'A', &levels.bottom)
        };
        for (offset, base) in template.iter_mut().enumerate() {
            if *base != target {
                continue;
            }
            let level = level_fraction(track[fragment.begin + offset]);
            if rng.random::<f64>() < (1.0 - level) * config.conversion_rate {
                *base = replacement;
            }
        }
    }

    /// Synthesizes read bases and qualities along a prepared template.
    ///
    /// Returns the number of template positions consumed.
    fn synthesize(
        &self,
        rng: &mut StdRng,
        template: &[u8],
        out_seq: &mut Vec<u8>,
        out_qual: &mut Vec<u8>,
        cigar: &mut Vec<CigarElement>,
    ) -> usize {
        out_seq.clear();
        out_qual.clear();
        cigar.clear();

        let mut consumed = 0usize;
        while out_seq.len() < self.read_length && consumed < template.len() {
            let pos = out_seq.len();
            let draw: f64 = rng.random();
            if pos > 0 && draw < self.prob_insertion {
                out_seq.push(random_base(rng));
                out_qual.push(self.sample_quality(pos, true, rng));
                push_op(cigar, CigarOp::Insertion);
            } else if pos > 0
                && draw < self.prob_insertion + self.prob_deletion
                && consumed + 1 < template.len()
            {
                consumed += 1;
                push_op(cigar, CigarOp::Deletion);
            } else {
                let mut base = template[consumed];
                let prob =
                    self.interpolate(self.prob_mismatch_begin, self.prob_mismatch_end, pos);
                let is_error = rng.random::<f64>() < prob;
                if is_error {
                    base = substitute_base(base, rng);
                }
                out_seq.push(base);
                out_qual.push(self.sample_quality(pos, is_error, rng));
                push_op(cigar, CigarOp::Match);
                consumed += 1;
            }
        }
        consumed
    }

    /// Simulates one read from a fixed strand of the fragment.
    #[allow(clippy::too_many_arguments)]
    fn simulate_strand(
        &self,
        rng: &mut StdRng,
        out_seq: &mut Vec<u8>,
        out_qual: &mut Vec<u8>,
        out_info: &mut SequencingSimulationInfo,
        haplotype: &[u8],
        fragment: Fragment,
        levels: Option<&MethylationLevels>,
        forward: bool,
    ) {
        out_info.clear();

        let raw = &haplotype[fragment.begin..fragment.end];
        let mut template = raw.to_vec();
        if let (Some(config), Some(levels)) = (self.bisulfite, levels) {
            if !levels.is_empty() {
                self.bisulfite_convert(config, fragment, &mut template, levels, forward, rng);
            }
        }
        if !forward {
            template = reverse_complement(&template);
        }

        let consumed = self.synthesize(rng, &template, out_seq, out_qual, &mut out_info.cigar);

        out_info.begin_pos =
            if forward { fragment.begin } else { fragment.end - consumed };
        out_info.is_forward = forward;
    }
}

impl SequencingSimulator for IlluminaSimulator {
    fn simulate_single_end(
        &self,
        rng: &mut StdRng,
        out_seq: &mut Vec<u8>,
        out_qual: &mut Vec<u8>,
        out_info: &mut SequencingSimulationInfo,
        haplotype: &[u8],
        fragment: Fragment,
        levels: Option<&MethylationLevels>,
    ) {
        let forward = rng.random_bool(0.5);
        self.simulate_strand(
            rng, out_seq, out_qual, out_info, haplotype, fragment, levels, forward,
        );
    }

    fn simulate_paired_end(
        &self,
        rng: &mut StdRng,
        out_seq_l: &mut Vec<u8>,
        out_qual_l: &mut Vec<u8>,
        out_info_l: &mut SequencingSimulationInfo,
        out_seq_r: &mut Vec<u8>,
        out_qual_r: &mut Vec<u8>,
        out_info_r: &mut SequencingSimulationInfo,
        haplotype: &[u8],
        fragment: Fragment,
        levels: Option<&MethylationLevels>,
    ) {
        // Which mate sits on the forward strand flips per fragment.
        let left_forward = rng.random_bool(0.5);
        self.simulate_strand(
            rng, out_seq_l, out_qual_l, out_info_l, haplotype, fragment, levels, left_forward,
        );
        self.simulate_strand(
            rng, out_seq_r, out_qual_r, out_info_r, haplotype, fragment, levels, !left_forward,
        );
    }
}
