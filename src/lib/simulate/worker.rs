//! Per-thread simulation state: RNG, sampler, simulator, and output buffers
//! for one chunk of fragment ordinals.

use crate::methylation::MethylationLevels;
use crate::sam::RecordBuilder;
use crate::simulate::fragment::{Fragment, FragmentSampler};
use crate::simulate::sequencing::{SequencingSimulationInfo, SequencingSimulator};
use crate::variants::pos_map::PositionMap;
use anyhow::Result;
use noodles::sam::alignment::record_buf::RecordBuf;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Static per-worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Simulate read pairs instead of single-end reads.
    pub paired: bool,
    /// Build true-alignment records alongside the reads.
    pub build_alignments: bool,
    /// Append the serialized simulation info to FASTQ read names.
    pub embed_read_info: bool,
    /// Prefix of every read name.
    pub read_name_prefix: String,
}

/// One worker's state, reused across chunks. Buffer contents are undefined
/// between chunks.
pub struct ReadSimulatorWorker {
    rng: StdRng,
    config: WorkerConfig,
    sampler: FragmentSampler,
    simulator: Box<dyn SequencingSimulator>,
    /// Fragment ordinals to simulate in the current chunk; filled by the
    /// orchestrator between barriers.
    pub fragment_ids: Vec<i32>,
    fragments: Vec<Fragment>,
    /// Read names for the chunk, mates interleaved for paired data.
    pub ids: Vec<String>,
    /// Read sequences for the chunk.
    pub seqs: Vec<Vec<u8>>,
    /// Numeric Phred qualities for the chunk.
    pub quals: Vec<Vec<u8>>,
    /// Simulation infos for the chunk.
    pub infos: Vec<SequencingSimulationInfo>,
    /// True-alignment records, when requested.
    pub records: Vec<RecordBuf>,
}

impl ReadSimulatorWorker {
    /// Creates a worker with a deterministically seeded RNG.
    #[must_use]
    pub fn new(
        seed: u64,
        config: WorkerConfig,
        sampler: FragmentSampler,
        simulator: Box<dyn SequencingSimulator>,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
            sampler,
            simulator,
            fragment_ids: Vec::new(),
            fragments: Vec::new(),
            ids: Vec::new(),
            seqs: Vec::new(),
            quals: Vec::new(),
            infos: Vec::new(),
            records: Vec::new(),
        }
    }

    /// FASTQ read name for one fragment; `mate` is 0 for single-end reads,
    /// 1 or 2 for paired mates.
    fn read_id(&self, frag_id: i32, mate: u8, info: &SequencingSimulationInfo) -> String {
        let mut id = format!("{}{}", self.config.read_name_prefix, frag_id + 1);
        match mate {
            1 => id.push_str("/1"),
            2 => id.push_str("/2"),
            _ => {}
        }
        if self.config.embed_read_info {
            id.push(' ');
            id.push_str(&info.to_string());
        }
        id
    }

    /// Query name for alignment records: no mate suffix, never embedded, so
    /// the SAM QNAME column stays canonical.
    fn record_name(&self, frag_id: i32) -> String {
        format!("{}{}", self.config.read_name_prefix, frag_id + 1)
    }

    /// Simulates one chunk against a materialized haplotype.
    ///
    /// # Errors
    ///
    /// Returns an error when alignment-record construction fails; worker
    /// errors abort the pipeline after the current barrier.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        haplotype: &[u8],
        pos_map: &PositionMap,
        ref_name: &str,
        ref_seq: &[u8],
        ref_id: usize,
        hap_id: usize,
        levels: Option<&MethylationLevels>,
    ) -> Result<()> {
        let mut fragments = std::mem::take(&mut self.fragments);
        self.sampler.generate_many(
            &mut fragments,
            &mut self.rng,
            haplotype.len(),
            self.fragment_ids.len(),
        );

        let mates = if self.config.paired { 2 } else { 1 };
        let read_count = fragments.len() * mates;
        self.ids.clear();
        self.ids.resize(read_count, String::new());
        self.seqs.resize_with(read_count, Vec::new);
        self.quals.resize_with(read_count, Vec::new);
        self.infos.resize_with(read_count, SequencingSimulationInfo::default);
        self.records.clear();

        let builder = RecordBuilder::new(pos_map, ref_name, ref_seq, ref_id, hap_id);

        for (k, fragment) in fragments.iter().enumerate() {
            let frag_id = self.fragment_ids[k];
            if self.config.paired {
                let (left, right) = (2 * k, 2 * k + 1);
                {
                    let (head, tail) = self.seqs.split_at_mut(right);
                    let (qhead, qtail) = self.quals.split_at_mut(right);
                    let (ihead, itail) = self.infos.split_at_mut(right);
                    self.simulator.simulate_paired_end(
                        &mut self.rng,
                        &mut head[left],
                        &mut qhead[left],
                        &mut ihead[left],
                        &mut tail[0],
                        &mut qtail[0],
                        &mut itail[0],
                        haplotype,
                        *fragment,
                        levels,
                    );
                }
                for (i, mate) in [(left, 1u8), (right, 2u8)] {
                    self.infos[i].ref_id = ref_id;
                    self.infos[i].hap_id = hap_id;
                    let id = self.read_id(frag_id, mate, &self.infos[i]);
                    self.ids[i] = id;
                }
                if self.config.build_alignments {
                    let (rec_l, rec_r) = builder.build_paired_end(
                        &self.infos[left],
                        &self.seqs[left],
                        &self.quals[left],
                        &self.infos[right],
                        &self.seqs[right],
                        &self.quals[right],
                        &self.record_name(frag_id),
                    )?;
                    self.records.push(rec_l);
                    self.records.push(rec_r);
                }
            } else {
                self.simulator.simulate_single_end(
                    &mut self.rng,
                    &mut self.seqs[k],
                    &mut self.quals[k],
                    &mut self.infos[k],
                    haplotype,
                    *fragment,
                    levels,
                );
                self.infos[k].ref_id = ref_id;
                self.infos[k].hap_id = hap_id;
                let id = self.read_id(frag_id, 0, &self.infos[k]);
                self.ids[k] = id;
                if self.config.build_alignments {
                    let record = builder.build_single_end(
                        &self.infos[k],
                        &self.seqs[k],
                        &self.quals[k],
                        &self.record_name(frag_id),
                    )?;
                    self.records.push(record);
                }
            }
        }

        self.fragments = fragments;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::illumina::IlluminaSimulator;
    use crate::variants::pos_map::PositionMap;

    fn test_worker(paired: bool, build_alignments: bool) -> ReadSimulatorWorker {
        let config = WorkerConfig {
            paired,
            build_alignments,
            embed_read_info: false,
            read_name_prefix: "sim.".to_string(),
        };
        let sampler = FragmentSampler { min_len: 20, max_len: 30, mean: 25.0, stddev: 2.0, ..FragmentSampler::default() };
        let simulator = IlluminaSimulator { read_length: 15, ..IlluminaSimulator::default() };
        ReadSimulatorWorker::new(42, config, sampler, Box::new(simulator))
    }

    fn haplotype() -> Vec<u8> {
        (0..200).map(|i| b"ACGT"[(i * 3) % 4]).collect()
    }

    #[test]
    fn test_single_end_chunk() {
        let hap = haplotype();
        let pos_map = PositionMap::identity(hap.len());
        let mut worker = test_worker(false, true);
        worker.fragment_ids = vec![0, 1, 2, 7];

        worker.run(&hap, &pos_map, "chr1", &hap, 0, 0, None).unwrap();

        assert_eq!(worker.ids.len(), 4);
        assert_eq!(worker.seqs.len(), 4);
        assert_eq!(worker.records.len(), 4);
        assert_eq!(worker.ids[0], "sim.1");
        assert_eq!(worker.ids[3], "sim.8");
        for (seq, qual) in worker.seqs.iter().zip(&worker.quals) {
            assert_eq!(seq.len(), qual.len());
        }
    }

    #[test]
    fn test_paired_chunk_interleaves_mates() {
        let hap = haplotype();
        let pos_map = PositionMap::identity(hap.len());
        let mut worker = test_worker(true, true);
        worker.fragment_ids = vec![4, 9];

        worker.run(&hap, &pos_map, "chr1", &hap, 0, 0, None).unwrap();

        assert_eq!(worker.ids, vec!["sim.5/1", "sim.5/2", "sim.10/1", "sim.10/2"]);
        assert_eq!(worker.records.len(), 4);
        // Query names carry no mate suffix.
        for record in &worker.records {
            let name = record.name().unwrap().to_string();
            assert!(name == "sim.5" || name == "sim.10");
        }
    }

    #[test]
    fn test_short_contig_produces_no_reads() {
        let hap = b"ACGT".to_vec();
        let pos_map = PositionMap::identity(4);
        let mut worker = test_worker(false, false);
        worker.fragment_ids = vec![0, 1, 2];

        worker.run(&hap, &pos_map, "chr1", &hap, 0, 0, None).unwrap();
        assert!(worker.ids.is_empty());
        assert!(worker.records.is_empty());
    }

    #[test]
    fn test_embedded_info() {
        let hap = haplotype();
        let pos_map = PositionMap::identity(hap.len());
        let mut config_worker = test_worker(false, false);
        config_worker.config.embed_read_info = true;
        config_worker.fragment_ids = vec![0];

        config_worker.run(&hap, &pos_map, "chr1", &hap, 0, 0, None).unwrap();
        let id = &config_worker.ids[0];
        assert!(id.starts_with("sim.1 REF=0 HAP=0 BEGIN="), "unexpected id {id}");
        assert!(id.contains("CIGAR="));
    }
}
