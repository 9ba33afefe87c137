// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Boundary signals between the harness and the engine under test.
//!
//! Signals are grouped by the one party allowed to drive them. An agent only
//! ever receives `&mut` access to its own group, so two drivers on the same
//! line cannot be written.

use crate::signals::Wire;

/// `OKAY` write response code.
pub const RESP_OKAY: u8 = 0;

/// All byte lanes valid; partial-word writes are not modeled.
pub const STRB_ALL: u8 = 0xF;

/// Data input, driven by the data feed driver.
#[derive(Debug, Clone, Default)]
pub struct FeedPins {
    pub data: Wire<u32>,
    pub wstb: Wire<bool>,
    pub done: Wire<bool>,
}

/// Buffer management inputs, driven by the address sequencer.
#[derive(Debug, Clone, Default)]
pub struct ControlPins {
    pub reset: Wire<bool>,
    pub init: Wire<bool>,
    pub addr: Wire<u32>,
    pub addr_wstb: Wire<bool>,
    pub block_size: Wire<u32>,
}

/// Engine status outputs.
#[derive(Debug, Clone, Default)]
pub struct StatusPins {
    pub irq: Wire<bool>,
    /// Raw FSM state, see [`crate::engine::EngineState`].
    pub fsm: Wire<u8>,
}

/// Write channel signals driven by the engine (the requester).
#[derive(Debug, Clone, Default)]
pub struct AxiMasterPins {
    pub awaddr: Wire<u32>,
    pub awvalid: Wire<bool>,
    pub wdata: Wire<u32>,
    pub wstrb: Wire<u8>,
    pub wvalid: Wire<bool>,
    pub wlast: Wire<bool>,
    pub bready: Wire<bool>,
}

/// Write channel signals driven by the bus agent (the responder).
#[derive(Debug, Clone, Default)]
pub struct AxiSlavePins {
    pub awready: Wire<bool>,
    pub wready: Wire<bool>,
    pub bvalid: Wire<bool>,
    pub bresp: Wire<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Ports {
    pub feed: FeedPins,
    pub control: ControlPins,
    pub status: StatusPins,
    pub master: AxiMasterPins,
    pub slave: AxiSlavePins,
}

impl FeedPins {
    fn commit(&mut self) {
        self.data.commit();
        self.wstb.commit();
        self.done.commit();
    }
}

impl ControlPins {
    fn commit(&mut self) {
        self.reset.commit();
        self.init.commit();
        self.addr.commit();
        self.addr_wstb.commit();
        self.block_size.commit();
    }
}

impl StatusPins {
    fn commit(&mut self) {
        self.irq.commit();
        self.fsm.commit();
    }
}

impl AxiMasterPins {
    fn commit(&mut self) {
        self.awaddr.commit();
        self.awvalid.commit();
        self.wdata.commit();
        self.wstrb.commit();
        self.wvalid.commit();
        self.wlast.commit();
        self.bready.commit();
    }
}

impl AxiSlavePins {
    fn commit(&mut self) {
        self.awready.commit();
        self.wready.commit();
        self.bvalid.commit();
        self.bresp.commit();
    }
}

impl Ports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every driven value across the tick boundary.
    pub fn commit(&mut self) {
        self.feed.commit();
        self.control.commit();
        self.status.commit();
        self.master.commit();
        self.slave.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_covers_every_group() {
        let mut ports = Ports::new();
        ports.feed.wstb.set(true);
        ports.control.addr.set(0x1000);
        ports.status.irq.set(true);
        ports.master.wlast.set(true);
        ports.slave.bresp.set(2);

        assert!(!ports.feed.wstb.get());
        ports.commit();
        assert!(ports.feed.wstb.get());
        assert_eq!(ports.control.addr.get(), 0x1000);
        assert!(ports.status.irq.get());
        assert!(ports.master.wlast.get());
        assert_eq!(ports.slave.bresp.get(), 2);
    }
}
