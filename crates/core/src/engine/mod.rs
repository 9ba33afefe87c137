// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Contract between the harness and the engine under test.
//!
//! The engine is a black box clocked once per tick. The only internal state
//! the harness looks at is the raw FSM encoding on [`StatusPins::fsm`], and
//! only at the two priming checkpoints of the address sequencer.

mod reference;

pub use reference::{PcapDmaModel, MAX_BURST_BEATS};

use crate::ports::{AxiMasterPins, AxiSlavePins, ControlPins, FeedPins, StatusPins};

/// Raw FSM state exposed by the engine.
///
/// `0` is `Init` (waiting for the start pulse), `1` is `Active` (streaming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[repr(u8)]
pub enum EngineState {
    Init = 0,
    Active = 1,
}

impl EngineState {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(EngineState::Init),
            1 => Some(EngineState::Active),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }
}

/// Everything the engine samples at a clock edge.
#[derive(Debug, Clone, Copy)]
pub struct EngineInputs<'a> {
    pub feed: &'a FeedPins,
    pub control: &'a ControlPins,
    pub axi: &'a AxiSlavePins,
}

/// Everything the engine drives.
#[derive(Debug)]
pub struct EngineOutputs<'a> {
    pub status: &'a mut StatusPins,
    pub axi: &'a mut AxiMasterPins,
}

/// A double-buffered DMA write engine.
pub trait DmaEngine {
    /// One rising clock edge: sample `inputs`, drive `outputs`.
    fn clock(&mut self, inputs: EngineInputs<'_>, outputs: EngineOutputs<'_>);

    fn name(&self) -> &str {
        "dma"
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

impl<E: DmaEngine + ?Sized> DmaEngine for Box<E> {
    fn clock(&mut self, inputs: EngineInputs<'_>, outputs: EngineOutputs<'_>) {
        (**self).clock(inputs, outputs)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn snapshot(&self) -> serde_json::Value {
        (**self).snapshot()
    }
}
