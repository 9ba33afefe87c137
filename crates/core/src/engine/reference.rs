// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{DmaEngine, EngineInputs, EngineOutputs, EngineState};
use crate::ports::{AxiMasterPins, AxiSlavePins, StatusPins, STRB_ALL};
use std::collections::VecDeque;

/// Longest burst the engine issues.
pub const MAX_BURST_BEATS: usize = 16;

const DEFAULT_FIFO_DEPTH: usize = 1024;
const WORD_BYTES: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
enum BurstPhase {
    Idle,
    Transfer {
        beats: Vec<u32>,
        sent: usize,
        addr_accepted: bool,
    },
    Response {
        beats: u32,
    },
}

/// Behavioral model of the capture DMA engine.
///
/// Words strobed in while active are queued in a FIFO and written out in
/// bursts of up to [`MAX_BURST_BEATS`] beats, never crossing the end of the
/// current buffer. When a buffer is full the primed buffer takes its place and
/// `irq` pulses for one tick. After `done`, whatever is buffered is flushed,
/// `irq` pulses once more and the engine returns to `Init`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PcapDmaModel {
    state: EngineState,
    current: Option<u32>,
    next: Option<u32>,
    /// Words retired into the current buffer.
    written: u32,
    fifo: VecDeque<u32>,
    fifo_depth: usize,
    flushing: bool,
    burst: BurstPhase,
    overflowed: bool,
    dropped_addresses: u64,
    interrupts: u64,
}

impl Default for PcapDmaModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PcapDmaModel {
    pub fn new() -> Self {
        Self::with_fifo_depth(DEFAULT_FIFO_DEPTH)
    }

    pub fn with_fifo_depth(fifo_depth: usize) -> Self {
        Self {
            state: EngineState::Init,
            current: None,
            next: None,
            written: 0,
            fifo: VecDeque::with_capacity(fifo_depth),
            fifo_depth,
            flushing: false,
            burst: BurstPhase::Idle,
            overflowed: false,
            dropped_addresses: 0,
            interrupts: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn current_buffer(&self) -> Option<u32> {
        self.current
    }

    pub fn primed_buffer(&self) -> Option<u32> {
        self.next
    }

    pub fn buffered_words(&self) -> usize {
        self.fifo.len()
    }

    pub fn interrupts(&self) -> u64 {
        self.interrupts
    }

    pub fn dropped_addresses(&self) -> u64 {
        self.dropped_addresses
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    fn reset(&mut self, axi: &mut AxiMasterPins) {
        *self = Self::with_fifo_depth(self.fifo_depth);
        axi.awvalid.set(false);
        axi.wvalid.set(false);
        axi.wlast.set(false);
    }

    fn accept_address(&mut self, addr: u32) {
        if self.state == EngineState::Active && self.current.is_none() {
            tracing::debug!("DMA resuming into buffer {:#010X}", addr);
            self.current = Some(addr);
        } else if self.next.is_none() {
            self.next = Some(addr);
        } else {
            tracing::warn!("DMA address {:#010X} dropped, both buffers taken", addr);
            self.dropped_addresses += 1;
        }
    }

    fn start(&mut self) {
        if self.state != EngineState::Init {
            return;
        }
        match self.next.take() {
            Some(addr) => {
                self.current = Some(addr);
                self.written = 0;
                self.flushing = false;
                self.state = EngineState::Active;
            }
            None => tracing::warn!("DMA init ignored, no buffer address"),
        }
    }

    fn push_word(&mut self, word: u32) {
        if self.fifo.len() >= self.fifo_depth {
            if !self.overflowed {
                tracing::warn!("DMA FIFO overflow, dropping data");
            }
            self.overflowed = true;
            return;
        }
        self.fifo.push_back(word);
    }

    fn complete_block(&mut self, status: &mut StatusPins) {
        tracing::debug!("DMA buffer {:?} complete", self.current);
        self.pulse_irq(status);
        self.written = 0;
        self.current = self.next.take();
    }

    fn finish_transfer(&mut self, status: &mut StatusPins) {
        tracing::debug!("DMA transfer finished, {} words in last buffer", self.written);
        if self.written > 0 {
            self.pulse_irq(status);
        }
        self.state = EngineState::Init;
        self.current = None;
        self.written = 0;
        self.flushing = false;
    }

    fn pulse_irq(&mut self, status: &mut StatusPins) {
        status.irq.set(true);
        self.interrupts += 1;
    }

    fn try_issue(
        &mut self,
        axi: &mut AxiMasterPins,
        status: &mut StatusPins,
        block_words: u32,
    ) -> BurstPhase {
        if self.state != EngineState::Active {
            return BurstPhase::Idle;
        }
        let Some(base) = self.current else {
            return BurstPhase::Idle;
        };

        let available = self.fifo.len();
        if available == 0 {
            if self.flushing {
                self.finish_transfer(status);
            }
            return BurstPhase::Idle;
        }

        let room = block_words.saturating_sub(self.written).max(1) as usize;
        let wanted = room.min(MAX_BURST_BEATS);
        if available < wanted && !self.flushing {
            return BurstPhase::Idle;
        }

        let beats: Vec<u32> = self.fifo.drain(..wanted.min(available)).collect();
        let addr = base + self.written * WORD_BYTES;
        tracing::trace!("DMA burst of {} to {:#010X}", beats.len(), addr);

        axi.awaddr.set(addr);
        axi.awvalid.set(true);
        axi.wdata.set(beats[0]);
        axi.wstrb.set(STRB_ALL);
        axi.wvalid.set(true);
        axi.wlast.set(beats.len() == 1);

        BurstPhase::Transfer {
            beats,
            sent: 0,
            addr_accepted: false,
        }
    }

    fn advance(
        &mut self,
        slave: &AxiSlavePins,
        axi: &mut AxiMasterPins,
        status: &mut StatusPins,
        block_words: u32,
    ) {
        let phase = std::mem::replace(&mut self.burst, BurstPhase::Idle);
        self.burst = match phase {
            BurstPhase::Idle => self.try_issue(axi, status, block_words),
            BurstPhase::Transfer {
                beats,
                mut sent,
                mut addr_accepted,
            } => {
                if axi.awvalid.get() && slave.awready.get() {
                    addr_accepted = true;
                    axi.awvalid.set(false);
                }
                if axi.wvalid.get() && slave.wready.get() {
                    sent += 1;
                    if sent < beats.len() {
                        axi.wdata.set(beats[sent]);
                        axi.wlast.set(sent + 1 == beats.len());
                    } else {
                        axi.wvalid.set(false);
                        axi.wlast.set(false);
                    }
                }
                if addr_accepted && sent == beats.len() {
                    BurstPhase::Response {
                        beats: beats.len() as u32,
                    }
                } else {
                    BurstPhase::Transfer {
                        beats,
                        sent,
                        addr_accepted,
                    }
                }
            }
            BurstPhase::Response { beats } => {
                if slave.bvalid.get() && axi.bready.get() {
                    self.written += beats;
                    if self.written >= block_words {
                        self.complete_block(status);
                    }
                    self.try_issue(axi, status, block_words)
                } else {
                    BurstPhase::Response { beats }
                }
            }
        };
    }
}

impl DmaEngine for PcapDmaModel {
    fn clock(&mut self, inputs: EngineInputs<'_>, outputs: EngineOutputs<'_>) {
        let EngineOutputs { status, axi } = outputs;
        status.irq.set(false);
        axi.bready.set(true);

        if inputs.control.reset.get() {
            self.reset(axi);
            status.fsm.set(self.state.raw());
            return;
        }

        if inputs.control.addr_wstb.get() {
            self.accept_address(inputs.control.addr.get());
        }
        if inputs.control.init.get() {
            self.start();
        }
        if self.state == EngineState::Active {
            if inputs.feed.wstb.get() {
                self.push_word(inputs.feed.data.get());
            }
            if inputs.feed.done.get() {
                self.flushing = true;
            }
        }

        let block_words = (inputs.control.block_size.get() / WORD_BYTES).max(1);
        self.advance(inputs.axi, axi, status, block_words);
        status.fsm.set(self.state.raw());
    }

    fn name(&self) -> &str {
        "pcap_dma"
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
