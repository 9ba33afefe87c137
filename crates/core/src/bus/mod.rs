// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::ports::{AxiMasterPins, AxiSlavePins, RESP_OKAY};
use crate::{SimResult, SimulationError};
use std::sync::Arc;

/// A completed write burst: destination address and the beats in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTransaction {
    pub address: u32,
    pub words: Vec<u32>,
}

/// Receives every burst the bus agent reassembles.
pub trait BurstObserver: Send + Sync {
    fn on_burst(&self, txn: &WriteTransaction) -> SimResult<()>;
}

/// Responder side of the write channel.
///
/// Simplifications:
/// - the address arrives no later than the last data beat of its burst
/// - one burst at a time: address-ready drops once an address is captured
///   and comes back when that burst's last beat arrives
/// - byte strobes are assumed all-ones
pub struct AxiWriteSlave {
    observers: Vec<Arc<dyn BurstObserver>>,
    pending_address: Option<u32>,
    pending_data: Vec<u32>,
    outstanding: u64,
    bursts: u64,
    responses: u64,
    stopped: bool,
}

impl std::fmt::Debug for AxiWriteSlave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxiWriteSlave")
            .field("observers", &self.observers.len())
            .field("pending_address", &self.pending_address)
            .field("pending_beats", &self.pending_data.len())
            .field("outstanding", &self.outstanding)
            .field("bursts", &self.bursts)
            .field("responses", &self.responses)
            .finish()
    }
}

impl Default for AxiWriteSlave {
    fn default() -> Self {
        Self::new()
    }
}

impl AxiWriteSlave {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            pending_address: None,
            pending_data: Vec::new(),
            outstanding: 0,
            bursts: 0,
            responses: 0,
            stopped: false,
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn BurstObserver>) {
        self.observers.push(observer);
    }

    /// Drives the idle state of the responder signals.
    pub fn attach(&self, pins: &mut AxiSlavePins) {
        pins.awready.set(true);
        pins.wready.set(true);
        pins.bvalid.set(false);
        pins.bresp.set(RESP_OKAY);
    }

    /// Stops reacting to ticks. Signals keep their last driven values.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    pub fn responses(&self) -> u64 {
        self.responses
    }

    /// Responses owed to the requester.
    pub fn outstanding(&self) -> u64 {
        self.outstanding
    }

    pub fn tick(&mut self, pins: &mut AxiSlavePins, master: &AxiMasterPins) -> SimResult<()> {
        if self.stopped {
            return Ok(());
        }

        if master.awvalid.get() && pins.awready.get() {
            let addr = master.awaddr.get();
            tracing::debug!("AXI Write Slave received address {:#010X}", addr);
            self.pending_address = Some(addr);
            pins.awready.set(false);
        }

        if master.wvalid.get() && pins.wready.get() {
            self.pending_data.push(master.wdata.get());
            if master.wlast.get() {
                self.complete_burst(pins)?;
            }
        }

        if pins.bvalid.get() && master.bready.get() {
            self.outstanding = self.outstanding.checked_sub(1).ok_or_else(|| {
                SimulationError::ProtocolViolation(
                    "response accepted with no burst outstanding".to_string(),
                )
            })?;
            self.responses += 1;
        }
        pins.bvalid.set(self.outstanding > 0);
        Ok(())
    }

    fn complete_burst(&mut self, pins: &mut AxiSlavePins) -> SimResult<()> {
        tracing::debug!(
            "AXI Write Slave received burst of {}",
            self.pending_data.len()
        );
        let Some(address) = self.pending_address.take() else {
            return Err(SimulationError::ProtocolViolation(
                "address must be set before last data beat".to_string(),
            ));
        };
        let txn = WriteTransaction {
            address,
            words: std::mem::take(&mut self.pending_data),
        };
        for observer in &self.observers {
            observer.on_burst(&txn)?;
        }
        self.outstanding += 1;
        self.bursts += 1;
        pins.awready.set(true);
        Ok(())
    }
}
