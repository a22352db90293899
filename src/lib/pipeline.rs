//! The top-level simulation state machine.
//!
//! Three phases, run in order:
//!
//! 1. **Distribute** — every fragment ordinal is assigned to a
//!    (contig, haplotype) bucket with probability proportional to contig
//!    length and spilled to that bucket's ordinal file.
//! 2. **Simulate** — buckets are visited in materialization order; each
//!    bucket's ordinals are consumed in chunks, dispatched across the
//!    worker pool behind a fork-join barrier, and the workers' reads and
//!    alignment records are spilled per bucket.
//! 3. **Join** — bucket spills are streamed into the final FASTQ file(s)
//!    and the SAM output, in bucket enumeration order with insertion order
//!    preserved inside each bucket.
//!
//! The output is deterministic for a fixed `{seed, seed_spacing,
//! num_threads, chunk_size}`.

use crate::fastq::{self, FastqWriter};
use crate::methylation::MethylationLevels;
use crate::progress::{log_summary, ContigProgress};
use crate::sam::build_header;
use crate::simulate::fragment::FragmentSampler;
use crate::simulate::illumina::IlluminaSimulator;
use crate::simulate::worker::{ReadSimulatorWorker, WorkerConfig};
use crate::splitter::{BucketWriter, IdSplitter};
use crate::variants::materializer::VcfMaterializer;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record_buf::RecordBuf;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Weighted fragment-to-bucket assignment.
pub struct ContigPicker {
    /// Per-contig prefix sums of lengths.
    length_sums: Vec<u64>,
    num_haplotypes: usize,
}

impl ContigPicker {
    /// Builds prefix sums over the given contig lengths.
    #[must_use]
    pub fn new(lengths: &[usize], num_haplotypes: usize) -> Self {
        let mut length_sums = Vec::with_capacity(lengths.len());
        let mut total = 0u64;
        for &len in lengths {
            total += len as u64;
            length_sums.push(total);
        }
        Self { length_sums, num_haplotypes }
    }

    /// Draws a (contig, haplotype) pair; contigs are weighted by length,
    /// haplotypes are uniform. On a prefix-sum boundary the lower-index
    /// contig wins.
    pub fn pick(&self, rng: &mut StdRng) -> (usize, usize) {
        let total = *self.length_sums.last().expect("at least one contig");
        let draw = rng.random_range(0..total);
        let contig = self.length_sums.partition_point(|&sum| sum <= draw);
        let haplotype = rng.random_range(0..self.num_haplotypes);
        (contig, haplotype)
    }

    /// Linearizes a (contig, haplotype) pair into a bucket index.
    #[must_use]
    pub fn to_id(&self, pick: (usize, usize)) -> usize {
        pick.0 * self.num_haplotypes + pick.1
    }
}

/// Everything the pipeline needs beyond its input files.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of fragments to distribute across the genome.
    pub num_fragments: usize,
    /// Worker thread count.
    pub num_threads: usize,
    /// Ordinals handed to one worker per barrier round.
    pub chunk_size: usize,
    /// Base RNG seed.
    pub seed: u64,
    /// Seed distance between worker RNGs.
    pub seed_spacing: u64,
    /// Prefix of every read name.
    pub read_name_prefix: String,
    /// Append serialized simulation info to FASTQ read names.
    pub embed_read_info: bool,
    /// Left (or single-end) FASTQ output path.
    pub out_left: PathBuf,
    /// Right FASTQ output path; enables paired-end simulation.
    pub out_right: Option<PathBuf>,
    /// SAM output path; enables true-alignment records.
    pub out_sam: Option<PathBuf>,
    /// Simulate single-end reads even when a right output is given.
    pub force_single_end: bool,
    /// Fragment sampling parameters.
    pub sampler: FragmentSampler,
    /// Base-call error model parameters.
    pub simulator: IlluminaSimulator,
}

impl PipelineConfig {
    fn paired(&self) -> bool {
        self.out_right.is_some() && !self.force_single_end
    }
}

/// The simulator pipeline; see the module docs for the phase breakdown.
pub struct SimulatorPipeline {
    config: PipelineConfig,
    materializer: VcfMaterializer,
}

impl SimulatorPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, materializer: VcfMaterializer) -> Self {
        Self { config, materializer }
    }

    /// Runs all three phases to completion.
    ///
    /// # Errors
    ///
    /// Any I/O failure, inconsistent variant, or realignment failure aborts
    /// the run with a descriptive error.
    pub fn run(&mut self) -> Result<()> {
        if self.config.num_fragments == 0 {
            bail!("Nothing to simulate: num_fragments is 0");
        }

        let num_contigs = self.materializer.reference().num_seqs();
        if num_contigs == 0 {
            bail!("Reference index contains no sequences");
        }
        let num_haplotypes = self.materializer.num_haplotypes;
        let num_buckets = num_contigs * num_haplotypes;

        let lengths: Vec<usize> =
            (0..num_contigs).map(|i| self.materializer.reference().sequence_length(i)).collect();
        if lengths.iter().sum::<usize>() == 0 {
            bail!("Reference contigs have zero total length");
        }
        let picker = ContigPicker::new(&lengths, num_haplotypes);

        let header = match &self.config.out_sam {
            Some(_) => {
                let variant_contigs =
                    self.materializer.variants().map(|set| set.contig_names.as_slice());
                // Contig declarations may be absent from the VCF header;
                // fall back to the reference index names.
                let variant_contigs = variant_contigs.filter(|names| !names.is_empty());
                Some(build_header(self.materializer.reference(), variant_contigs)?)
            }
            None => None,
        };

        // Distribute.
        info!(
            "Distributing {} fragments to {num_contigs} contigs ({num_haplotypes} haplotypes each)",
            self.config.num_fragments
        );
        let mut id_splitter = IdSplitter::create(num_buckets)?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        for ordinal in 0..self.config.num_fragments {
            let bucket = picker.to_id(picker.pick(&mut rng));
            id_splitter.write_id(bucket, ordinal as i32)?;
        }
        let mut id_reader = id_splitter.into_readers()?;

        // Simulate.
        let worker_config = WorkerConfig {
            paired: self.config.paired(),
            build_alignments: self.config.out_sam.is_some(),
            embed_read_info: self.config.embed_read_info,
            read_name_prefix: self.config.read_name_prefix.clone(),
        };
        let mut workers: Vec<ReadSimulatorWorker> = (0..self.config.num_threads.max(1))
            .map(|index| {
                ReadSimulatorWorker::new(
                    self.config.seed + index as u64 * self.config.seed_spacing,
                    worker_config.clone(),
                    self.config.sampler.clone(),
                    Box::new(self.config.simulator.clone()),
                )
            })
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.len())
            .build()
            .context("Failed to create worker thread pool")?;

        let mut frag_spill = BucketWriter::create(num_buckets, "reads")?;
        let mut aln_spill = match &self.config.out_sam {
            Some(_) => Some(BucketWriter::create(num_buckets, "alignments")?),
            None => None,
        };
        let mut counts: Vec<u64> = vec![0; num_buckets];

        let mut seq = Vec::new();
        let mut levels = MethylationLevels::default();
        let (mut ref_id, mut hap_id) = (0usize, 0usize);
        while self.materializer.materialize_next(&mut seq, &mut levels, &mut ref_id, &mut hap_id)?
        {
            let ref_name = self.materializer.reference().sequence_name(ref_id);
            let ref_seq = self.materializer.original_sequence();
            let pos_map = &self.materializer.pos_map;
            let bucket = ref_id * num_haplotypes + hap_id;
            let levels_ref = if levels.is_empty() { None } else { Some(&levels) };

            if seq.len() < self.config.sampler.min_len {
                warn!(
                    "{ref_name} (allele {}) is shorter than the minimum fragment length; \
                     its fragments produce no reads",
                    hap_id + 1
                );
            }

            let mut progress = ContigProgress::new(format!("{ref_name} (allele {})", hap_id + 1));
            loop {
                let mut exhausted = false;
                for worker in &mut workers {
                    let read = id_reader.read_chunk(
                        bucket,
                        &mut worker.fragment_ids,
                        self.config.chunk_size,
                    )?;
                    if read == 0 {
                        exhausted = true;
                    }
                }

                // Fork-join barrier: all workers simulate their chunk, then
                // the orchestrator collects in worker order.
                let results: Vec<Result<()>> = pool.install(|| {
                    workers
                        .par_iter_mut()
                        .map(|worker| {
                            worker.run(
                                &seq, pos_map, &ref_name, ref_seq, ref_id, hap_id, levels_ref,
                            )
                        })
                        .collect()
                });
                for result in results {
                    result?;
                }

                for worker in &mut workers {
                    progress.add_chunk(worker.fragment_ids.len() as u64);
                    let out = frag_spill.writer(bucket);
                    for ((id, read_seq), read_qual) in
                        worker.ids.iter().zip(&worker.seqs).zip(&worker.quals)
                    {
                        fastq::write_record_to(out, id, read_seq, read_qual)?;
                    }
                    if let (Some(spill), Some(header)) = (&mut aln_spill, &header) {
                        let mut writer = noodles::sam::io::Writer::new(spill.writer(bucket));
                        for record in &worker.records {
                            writer.write_alignment_record(header, record)?;
                        }
                    }
                }

                if exhausted {
                    break;
                }
            }
            counts[bucket] = progress.finish();
        }

        let labeled_counts: Vec<(String, u64)> = counts
            .iter()
            .enumerate()
            .map(|(bucket, &count)| {
                let name = self.materializer.reference().sequence_name(bucket / num_haplotypes);
                (format!("{name} (allele {})", bucket % num_haplotypes + 1), count)
            })
            .collect();
        log_summary(&labeled_counts);

        // Join.
        info!("Joining temporary files");
        self.join_fastq(frag_spill)?;
        if let (Some(spill), Some(header), Some(path)) =
            (aln_spill, &header, &self.config.out_sam)
        {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = noodles::sam::io::Writer::new(BufWriter::new(file));
            writer.write_header(header)?;

            let mut reader_set = spill.into_readers()?;
            let mut record = RecordBuf::default();
            for bucket in 0..num_buckets {
                let mut reader = noodles::sam::io::Reader::new(reader_set.reader(bucket));
                while reader.read_record_buf(header, &mut record)? != 0 {
                    writer.write_alignment_record(header, &record)?;
                }
            }
        }

        info!("Done");
        Ok(())
    }

    /// Streams the per-bucket FASTQ spills into the final output file(s).
    fn join_fastq(&self, frag_spill: BucketWriter) -> Result<()> {
        let num_buckets = frag_spill.num_buckets();
        let mut reader_set = frag_spill.into_readers()?;

        let mut left = FastqWriter::create(&self.config.out_left)?;
        let mut right = match (&self.config.out_right, self.config.paired()) {
            (Some(path), true) => Some(FastqWriter::create(path)?),
            _ => None,
        };

        for bucket in 0..num_buckets {
            let reader = reader_set.reader(bucket);
            match &mut right {
                // Paired-end spills interleave mates; split them back out.
                Some(right) => loop {
                    let Some(first) = fastq::read_record(reader)? else { break };
                    let second = fastq::read_record(reader)?
                        .context("Odd number of reads in a paired-end spill")?;
                    left.write_ascii_record(&first.name, &first.sequence, &first.qualities)?;
                    right.write_ascii_record(&second.name, &second.sequence, &second.qualities)?;
                },
                None => {
                    while let Some(record) = fastq::read_record(reader)? {
                        left.write_ascii_record(&record.name, &record.sequence, &record.qualities)?;
                    }
                }
            }
        }

        left.finish()?;
        if let Some(right) = right {
            right.finish()?;
        }
        Ok(())
    }
}
