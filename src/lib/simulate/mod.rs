//! Read simulation: fragment sampling, sequencing simulators, and the
//! per-thread worker state.

pub mod fragment;
pub mod illumina;
pub mod sequencing;
pub mod worker;

pub use fragment::{Fragment, FragmentSampler, LengthModel};
pub use illumina::IlluminaSimulator;
pub use sequencing::{SequencingSimulationInfo, SequencingSimulator};
pub use worker::ReadSimulatorWorker;
