// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::AxiWriteSlave;
use crate::engine::{DmaEngine, EngineInputs, EngineOutputs};
use crate::feed::DataFeedDriver;
use crate::memory::GoldenMemory;
use crate::metrics::BusMetrics;
use crate::ports::Ports;
use crate::sequencer::{AddressSequencer, SequencerPhase};
use crate::{SimResult, SimulationError};
use dmatb_config::{Expectations, ScenarioConfig};
use std::sync::{Arc, Mutex};

/// What a finished scenario observed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub ticks: u64,
    pub bursts: u64,
    pub responses: u64,
    pub beats: u64,
    pub words_sent: u64,
    pub addresses_pushed: u64,
    pub interrupts: u64,
    pub sequencer_phase: SequencerPhase,
}

/// Wires the agents to one engine and drives a scenario against the clock.
///
/// Each tick every agent and the engine react to the values settled at the
/// previous boundary, then all signals are committed together. The tick budget
/// from the scenario bounds every wait, so a stalled engine ends in
/// [`SimulationError::TickBudgetExceeded`] rather than a hang.
pub struct Testbench<E: DmaEngine> {
    scenario: ScenarioConfig,
    ports: Ports,
    engine: E,
    feed: DataFeedDriver,
    sequencer: AddressSequencer,
    bus: AxiWriteSlave,
    memory: Arc<Mutex<GoldenMemory>>,
    metrics: Arc<BusMetrics>,
    ticks: u64,
}

impl<E: DmaEngine> Testbench<E> {
    pub fn new(engine: E, scenario: ScenarioConfig) -> SimResult<Self> {
        scenario.validate()?;
        let memory_size = scenario.memory_bytes()? as usize;
        let sequencer = AddressSequencer::new(
            &scenario.addresses,
            scenario.block_size,
            scenario.delay_in_irq,
        )?;

        let memory = Arc::new(Mutex::new(GoldenMemory::new(memory_size)));
        let metrics = Arc::new(BusMetrics::new());
        let mut bus = AxiWriteSlave::new();
        bus.add_observer(memory.clone());
        bus.add_observer(metrics.clone());

        let mut tb = Self {
            scenario,
            ports: Ports::new(),
            engine,
            feed: DataFeedDriver::new(),
            sequencer,
            bus,
            memory,
            metrics,
            ticks: 0,
        };
        tb.init_signals()?;
        Ok(tb)
    }

    /// Time zero: idle levels on every harness-driven line, then the
    /// sequencer's first zero-time actions.
    fn init_signals(&mut self) -> SimResult<()> {
        self.feed.attach(&mut self.ports.feed);
        self.sequencer.attach(&mut self.ports.control);
        self.bus.attach(&mut self.ports.slave);
        self.sequencer.resume(&mut self.ports.control, &self.ports.status)?;
        self.ports.commit();
        Ok(())
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn feed(&self) -> &DataFeedDriver {
        &self.feed
    }

    pub fn sequencer(&self) -> &AddressSequencer {
        &self.sequencer
    }

    pub fn bus(&self) -> &AxiWriteSlave {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut AxiWriteSlave {
        &mut self.bus
    }

    pub fn metrics(&self) -> Arc<BusMetrics> {
        self.metrics.clone()
    }

    pub fn memory(&self) -> Arc<Mutex<GoldenMemory>> {
        self.memory.clone()
    }

    /// Checks memory contents at `addr` against `expected`.
    pub fn verify(&self, addr: u64, expected: &[u32]) -> SimResult<()> {
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .verify(addr, expected)
    }

    /// One clock tick.
    pub fn step(&mut self) -> SimResult<()> {
        self.feed.tick(&mut self.ports.feed)?;
        self.sequencer.tick(&mut self.ports.control, &self.ports.status)?;
        self.bus.tick(&mut self.ports.slave, &self.ports.master)?;
        self.engine.clock(
            EngineInputs {
                feed: &self.ports.feed,
                control: &self.ports.control,
                axi: &self.ports.slave,
            },
            EngineOutputs {
                status: &mut self.ports.status,
                axi: &mut self.ports.master,
            },
        );
        self.ports.commit();
        self.ticks += 1;
        Ok(())
    }

    fn guard(&self, waiting_for: &'static str) -> SimResult<()> {
        if self.ticks >= self.scenario.max_ticks {
            tracing::warn!(
                "Tick budget {} exhausted waiting for {}",
                self.scenario.max_ticks,
                waiting_for
            );
            return Err(SimulationError::TickBudgetExceeded {
                budget: self.scenario.max_ticks,
                waiting_for,
            });
        }
        Ok(())
    }

    pub fn run_ticks(&mut self, ticks: u64) -> SimResult<()> {
        for _ in 0..ticks {
            self.guard("clock cycles")?;
            self.step()?;
        }
        Ok(())
    }

    /// Steps until `done` holds; returns the tick it first held at.
    pub fn run_until<F>(&mut self, waiting_for: &'static str, done: F) -> SimResult<u64>
    where
        F: Fn(&Self) -> bool,
    {
        while !done(self) {
            self.guard(waiting_for)?;
            self.step()?;
        }
        Ok(self.ticks)
    }

    pub fn wait_for_ready(&mut self) -> SimResult<u64> {
        let ready = self.sequencer.ready();
        self.run_until("address priming", |_| ready.is_set())
    }

    /// Queues words on the data feed. Work due now is driven immediately.
    pub fn send(&mut self, words: &[u32], synchronize: bool) -> SimResult<()> {
        self.feed.send(words, synchronize)?;
        self.feed.resume(&mut self.ports.feed)?;
        self.ports.commit();
        Ok(())
    }

    pub fn finish(&mut self) -> SimResult<()> {
        self.feed.finish();
        self.feed.resume(&mut self.ports.feed)?;
        self.ports.commit();
        Ok(())
    }

    pub fn report(&self) -> ScenarioReport {
        ScenarioReport {
            name: self.scenario.name.clone(),
            ticks: self.ticks,
            bursts: self.bus.bursts(),
            responses: self.bus.responses(),
            beats: self.metrics.get_beats(),
            words_sent: self.feed.words_sent(),
            addresses_pushed: self.sequencer.pushed(),
            interrupts: self.sequencer.interrupts_seen(),
            sequencer_phase: self.sequencer.phase(),
        }
    }

    /// Runs the scenario's stimulus, lets the engine settle, then checks the
    /// bus and memory against the scenario's expectations.
    pub fn run(&mut self) -> SimResult<ScenarioReport> {
        tracing::info!(
            "Running scenario '{}' on {}",
            self.scenario.name,
            self.engine.name()
        );
        self.wait_for_ready()?;

        let words = self.scenario.data.words();
        self.send(&words, true)?;
        self.finish()?;
        self.run_until("data feed to drain", |tb| tb.feed.is_idle())?;
        self.run_ticks(self.scenario.settle_ticks)?;

        let report = self.report();
        self.check(&self.scenario.expect, &report)?;
        tracing::info!(
            "Scenario '{}' passed: {} bursts in {} ticks",
            report.name,
            report.bursts,
            report.ticks
        );
        Ok(report)
    }

    fn check(&self, expect: &Expectations, report: &ScenarioReport) -> SimResult<()> {
        if report.responses != report.bursts {
            return Err(SimulationError::ResponseImbalance {
                bursts: report.bursts,
                responses: report.responses,
            });
        }
        if let Some(expected) = expect.bursts {
            if report.bursts != expected {
                return Err(SimulationError::BurstCount {
                    expected,
                    actual: report.bursts,
                });
            }
        }
        for region in &expect.regions {
            self.verify(region.address as u64, &region.data.words())?;
        }
        for region in &expect.untouched {
            self.verify(region.address as u64, &vec![0; region.words as usize])?;
        }
        Ok(())
    }
}
