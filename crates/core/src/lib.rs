// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Cycle-synchronous test bench for a double-buffered DMA write engine.
//!
//! The engine under test streams words it receives on its data port out to a
//! rotating set of destination buffers over a write-capture bus. The agents in
//! this crate feed it data, hand it destination addresses in lock-step with its
//! interrupt, play the memory side of the bus and check what ends up in memory.

pub mod bus;
pub mod engine;
pub mod feed;
pub mod memory;
pub mod metrics;
pub mod ports;
pub mod schedule;
pub mod sequencer;
pub mod signals;
pub mod testbench;

pub use bus::{AxiWriteSlave, BurstObserver, WriteTransaction};
pub use engine::{DmaEngine, EngineState, PcapDmaModel};
pub use feed::DataFeedDriver;
pub use memory::GoldenMemory;
pub use metrics::BusMetrics;
pub use sequencer::{AddressSequencer, SequencerPhase};
pub use testbench::{ScenarioReport, Testbench};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The engine broke the bus or priming contract the harness relies on.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("Memory mismatch at address {address:#010X}: expected {expected:#010X}, got {actual:#010X}")]
    ContentMismatch {
        address: u64,
        expected: u32,
        actual: u32,
    },
    #[error("Address {0:#010x} must be word-aligned")]
    Misaligned(u64),
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Invalid scenario: {0}")]
    Config(String),
    #[error("Tick budget of {budget} exhausted while waiting for {waiting_for}")]
    TickBudgetExceeded {
        budget: u64,
        waiting_for: &'static str,
    },
    #[error("Expected {expected} completed bursts, observed {actual}")]
    BurstCount { expected: u64, actual: u64 },
    #[error("{bursts} bursts completed but {responses} responses were accepted")]
    ResponseImbalance { bursts: u64, responses: u64 },
}

pub type SimResult<T> = Result<T, SimulationError>;

impl From<anyhow::Error> for SimulationError {
    fn from(err: anyhow::Error) -> Self {
        SimulationError::Config(format!("{:#}", err))
    }
}
