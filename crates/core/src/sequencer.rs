// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::engine::EngineState;
use crate::ports::{ControlPins, StatusPins};
use crate::schedule::{Flow, Program};
use crate::signals::{EdgeDetector, ReadinessEvent};
use crate::{SimResult, SimulationError};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SequencerPhase {
    Uninitialized,
    Resetting,
    PrimedFirst,
    Active,
    Drained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeqAction {
    Enter(SequencerPhase),
    BlockSize,
    Reset(bool),
    Init(bool),
    /// Pop the next address and strobe it in.
    Present,
    ReleaseStrobe,
    Expect(EngineState),
    SignalReady,
    AwaitIrq,
}

/// Keeps the engine supplied with destination buffers.
///
/// After a reset pulse it primes the engine with two addresses around the
/// start pulse, then answers every interrupt with the next queued address
/// until the queue runs dry.
#[derive(Debug)]
pub struct AddressSequencer {
    queue: VecDeque<u32>,
    block_size: u32,
    delay_in_irq: u32,
    phase: SequencerPhase,
    program: Program<SeqAction>,
    ready: ReadinessEvent,
    irq_edge: EdgeDetector,
    pushed: u64,
    interrupts_seen: u64,
}

impl AddressSequencer {
    pub fn new(addresses: &[u32], block_size: u32, delay_in_irq: u32) -> SimResult<Self> {
        if addresses.len() < 2 {
            return Err(SimulationError::Config(format!(
                "At least 2 addresses must be provided, got {}",
                addresses.len()
            )));
        }

        let mut sequencer = Self {
            queue: addresses.iter().copied().collect(),
            block_size,
            delay_in_irq,
            phase: SequencerPhase::Uninitialized,
            program: Program::new(),
            ready: ReadinessEvent::new(),
            irq_edge: EdgeDetector::new(),
            pushed: 0,
            interrupts_seen: 0,
        };
        sequencer.build_program(addresses.len());
        Ok(sequencer)
    }

    fn reset_sequence(&mut self) {
        self.program.wait(1);
        self.program.then(SeqAction::Reset(true));
        self.program.wait(1);
        self.program.then(SeqAction::Reset(false));
        self.program.wait(2);
    }

    fn push_sequence(&mut self) {
        self.program.wait(1);
        self.program.then(SeqAction::Present);
        self.program.wait(1);
        self.program.then(SeqAction::ReleaseStrobe);
        self.program.wait(1);
    }

    fn build_program(&mut self, addresses: usize) {
        self.program.then(SeqAction::BlockSize);
        self.program.then(SeqAction::Enter(SequencerPhase::Resetting));
        self.reset_sequence();

        self.push_sequence();
        self.program.then(SeqAction::Expect(EngineState::Init));
        self.program.then(SeqAction::Enter(SequencerPhase::PrimedFirst));

        self.program.then(SeqAction::Init(true));
        self.program.wait(1);
        self.program.then(SeqAction::Init(false));
        self.program.wait(1);
        self.program.then(SeqAction::Expect(EngineState::Active));
        self.program.then(SeqAction::Enter(SequencerPhase::Active));
        self.push_sequence();
        self.program.then(SeqAction::SignalReady);

        for _ in 2..addresses {
            self.program.then(SeqAction::AwaitIrq);
            self.program.wait(self.delay_in_irq);
            self.push_sequence();
        }
        self.program.then(SeqAction::Enter(SequencerPhase::Drained));
    }

    /// Drives the idle state of the control inputs.
    pub fn attach(&self, pins: &mut ControlPins) {
        pins.addr.set(0);
        pins.addr_wstb.set(false);
        pins.reset.set(false);
        pins.init.set(false);
    }

    /// Fires once both priming addresses are in.
    pub fn ready(&self) -> ReadinessEvent {
        self.ready.clone()
    }

    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    /// Addresses handed to the engine so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Rising edges seen on the interrupt line.
    pub fn interrupts_seen(&self) -> u64 {
        self.interrupts_seen
    }

    pub fn tick(&mut self, pins: &mut ControlPins, status: &StatusPins) -> SimResult<()> {
        let irq_rose = self.irq_edge.sample(status.irq.get());
        if irq_rose {
            self.interrupts_seen += 1;
        }
        let mut ctx = Context {
            queue: &mut self.queue,
            phase: &mut self.phase,
            ready: &self.ready,
            pushed: &mut self.pushed,
            block_size: self.block_size,
            irq_rose,
        };
        self.program.on_tick(|action| ctx.apply(*action, pins, status))
    }

    /// Runs work due in the current tick; used once at time zero.
    pub fn resume(&mut self, pins: &mut ControlPins, status: &StatusPins) -> SimResult<()> {
        let mut ctx = Context {
            queue: &mut self.queue,
            phase: &mut self.phase,
            ready: &self.ready,
            pushed: &mut self.pushed,
            block_size: self.block_size,
            irq_rose: false,
        };
        self.program.run(|action| ctx.apply(*action, pins, status))
    }
}

struct Context<'a> {
    queue: &'a mut VecDeque<u32>,
    phase: &'a mut SequencerPhase,
    ready: &'a ReadinessEvent,
    pushed: &'a mut u64,
    block_size: u32,
    irq_rose: bool,
}

impl Context<'_> {
    fn apply(
        &mut self,
        action: SeqAction,
        pins: &mut ControlPins,
        status: &StatusPins,
    ) -> SimResult<Flow> {
        match action {
            SeqAction::Enter(phase) => {
                tracing::trace!("Address sequencer {:?} -> {:?}", self.phase, phase);
                *self.phase = phase;
            }
            SeqAction::BlockSize => pins.block_size.set(self.block_size),
            SeqAction::Reset(level) => pins.reset.set(level),
            SeqAction::Init(level) => pins.init.set(level),
            SeqAction::Present => {
                let addr = self.queue.pop_front().ok_or_else(|| {
                    SimulationError::Config("address queue is empty".to_string())
                })?;
                tracing::debug!("Pushing DMA address {:#x}", addr);
                pins.addr.set(addr);
                pins.addr_wstb.set(true);
                *self.pushed += 1;
            }
            SeqAction::ReleaseStrobe => pins.addr_wstb.set(false),
            SeqAction::Expect(want) => {
                let raw = status.fsm.get();
                if EngineState::from_raw(raw) != Some(want) {
                    return Err(SimulationError::ProtocolViolation(format!(
                        "DMA FSM should be {:?}, read raw state {}",
                        want, raw
                    )));
                }
            }
            SeqAction::SignalReady => {
                self.ready.set();
            }
            SeqAction::AwaitIrq => {
                if !self.irq_rose {
                    return Ok(Flow::Block);
                }
            }
        }
        Ok(Flow::Continue)
    }
}
