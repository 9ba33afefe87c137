// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use dmatb_config::{DataSpec, RegionExpectation, ScenarioConfig, UntouchedRegion};
use dmatb_core::engine::{EngineInputs, EngineOutputs};
use dmatb_core::{
    BurstObserver, DmaEngine, PcapDmaModel, SequencerPhase, SimResult, SimulationError, Testbench,
    WriteTransaction,
};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn ramp(start: u32, count: u32) -> DataSpec {
    DataSpec::Ramp { start, count }
}

fn three_buffers() -> ScenarioConfig {
    let mut scenario = ScenarioConfig::new(
        "three-buffers",
        vec![0x1000, 0x2000, 0x3000],
        128,
        ramp(0, 48),
    );
    scenario.expect.bursts = Some(3);
    scenario.expect.regions = vec![
        RegionExpectation {
            address: 0x1000,
            data: ramp(0, 32),
        },
        RegionExpectation {
            address: 0x2000,
            data: ramp(32, 16),
        },
    ];
    scenario.expect.untouched = vec![UntouchedRegion {
        address: 0x3000,
        words: 32,
    }];
    scenario
}

/// Records every completed burst as (address, beats).
#[derive(Default)]
struct BurstLog(Mutex<Vec<(u32, usize)>>);

impl BurstObserver for BurstLog {
    fn on_burst(&self, txn: &WriteTransaction) -> SimResult<()> {
        self.0.lock().unwrap().push((txn.address, txn.words.len()));
        Ok(())
    }
}

/// Follows the reference model's FSM but drives a write beat with no address.
struct HeadlessWriter {
    inner: PcapDmaModel,
    fired: bool,
}

impl DmaEngine for HeadlessWriter {
    fn clock(&mut self, inputs: EngineInputs<'_>, outputs: EngineOutputs<'_>) {
        let EngineOutputs { status, axi } = outputs;
        self.inner.clock(
            inputs,
            EngineOutputs {
                status: &mut *status,
                axi: &mut *axi,
            },
        );
        if !self.fired && status.fsm.driven() == 1 {
            axi.awvalid.set(false);
            axi.wdata.set(0xDEAD_BEEF);
            axi.wvalid.set(true);
            axi.wlast.set(true);
            self.fired = true;
        }
    }
}

/// Reference model with its interrupt line cut.
struct Mute(PcapDmaModel);

impl DmaEngine for Mute {
    fn clock(&mut self, inputs: EngineInputs<'_>, outputs: EngineOutputs<'_>) {
        let EngineOutputs { status, axi } = outputs;
        self.0.clock(
            inputs,
            EngineOutputs {
                status: &mut *status,
                axi: &mut *axi,
            },
        );
        status.irq.set(false);
    }
}

#[test]
fn test_three_buffers_end_to_end() {
    init_tracing();
    let mut tb = Testbench::new(PcapDmaModel::new(), three_buffers()).unwrap();
    let report = tb.run().unwrap();

    assert_eq!(report.bursts, 3);
    assert_eq!(report.responses, 3);
    assert_eq!(report.beats, 48);
    assert_eq!(report.words_sent, 48);
    assert_eq!(report.addresses_pushed, 3);
    assert_eq!(report.interrupts, 2);
    assert_eq!(report.sequencer_phase, SequencerPhase::Drained);

    tb.verify(0x1000, &(0..32).collect::<Vec<_>>()).unwrap();
    tb.verify(0x2000, &(32..48).collect::<Vec<_>>()).unwrap();
    tb.verify(0x3000, &[0; 32]).unwrap();
    assert_eq!(tb.bus().outstanding(), 0);
    assert_eq!(tb.engine().snapshot()["state"], "Init");
    assert_eq!(tb.engine().dropped_addresses(), 0);
}

#[test]
fn test_bursts_never_cross_a_buffer() {
    let log = Arc::new(BurstLog::default());
    let mut tb = Testbench::new(PcapDmaModel::new(), three_buffers()).unwrap();
    tb.bus_mut().add_observer(log.clone());
    tb.run().unwrap();

    let bursts = log.0.lock().unwrap().clone();
    assert_eq!(bursts, vec![(0x1000, 16), (0x1040, 16), (0x2000, 16)]);

    let metrics = tb.metrics();
    assert_eq!(metrics.get_longest_burst(), 16);
    assert_eq!(metrics.get_beats_at(0x1040), 16);
    assert_eq!(metrics.burst_addresses(), vec![0x1000, 0x1040, 0x2000]);
}

#[test]
fn test_every_interrupt_releases_an_address() {
    let mut tb = Testbench::new(PcapDmaModel::new(), three_buffers()).unwrap();
    let report = tb.run().unwrap();
    let addresses = tb.scenario().addresses.len() as u64;
    assert_eq!(
        report.addresses_pushed,
        (addresses - 2).min(report.interrupts) + 2
    );
    assert_eq!(tb.sequencer().remaining(), 0);
}

#[test]
fn test_two_buffers_single_partial_burst() {
    let mut scenario = ScenarioConfig::new("two-buffers", vec![0x1000, 0x2000], 128, ramp(0, 8));
    scenario.expect.bursts = Some(1);
    scenario.expect.regions = vec![RegionExpectation {
        address: 0x1000,
        data: ramp(0, 8),
    }];

    let mut tb = Testbench::new(PcapDmaModel::new(), scenario).unwrap();
    let report = tb.run().unwrap();
    assert_eq!(report.bursts, 1);
    assert_eq!(report.responses, 1);
    assert_eq!(report.addresses_pushed, 2);
    assert_eq!(report.interrupts, 1);
    tb.verify(0x1020, &[0; 8]).unwrap();
    tb.verify(0x2000, &[0; 8]).unwrap();
}

#[test]
fn test_write_without_address_aborts_before_memory_changes() {
    init_tracing();
    let engine = HeadlessWriter {
        inner: PcapDmaModel::new(),
        fired: false,
    };
    let mut tb = Testbench::new(engine, three_buffers()).unwrap();
    let err = tb.run().unwrap_err();

    match &err {
        SimulationError::ProtocolViolation(msg) => {
            assert!(msg.contains("address must be set"), "{}", msg)
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(tb.bus().bursts(), 0);
    assert_eq!(tb.metrics().get_bursts(), 0);
    let memory = tb.memory();
    assert!(memory.lock().unwrap().data.iter().all(|b| *b == 0));
}

#[test]
fn test_silent_engine_exhausts_tick_budget() {
    let mut scenario = three_buffers();
    scenario.max_ticks = 500;
    let mut tb = Testbench::new(Mute(PcapDmaModel::new()), scenario).unwrap();
    tb.wait_for_ready().unwrap();
    tb.send(&(0..48).collect::<Vec<_>>(), true).unwrap();
    tb.finish().unwrap();

    let err = tb
        .run_until("sequencer to drain", |tb| {
            tb.sequencer().phase() == SequencerPhase::Drained
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::TickBudgetExceeded {
            budget: 500,
            waiting_for: "sequencer to drain"
        }
    ));
    assert_eq!(tb.sequencer().pushed(), 2);
    assert_eq!(tb.ticks(), 500);
}

#[test]
fn test_wrong_contents_reported_with_address() {
    let mut scenario = three_buffers();
    scenario.expect.regions = vec![RegionExpectation {
        address: 0x1000,
        data: ramp(1, 4),
    }];
    let mut tb = Testbench::new(PcapDmaModel::new(), scenario).unwrap();
    let err = tb.run().unwrap_err();
    assert!(matches!(
        err,
        SimulationError::ContentMismatch {
            address: 0x1000,
            expected: 1,
            actual: 0
        }
    ));
    assert_eq!(
        err.to_string(),
        "Memory mismatch at address 0x00001000: expected 0x00000001, got 0x00000000"
    );
}

#[test]
fn test_burst_count_expectation() {
    let mut scenario = three_buffers();
    scenario.expect.bursts = Some(4);
    let mut tb = Testbench::new(PcapDmaModel::new(), scenario).unwrap();
    let err = tb.run().unwrap_err();
    assert!(matches!(
        err,
        SimulationError::BurstCount {
            expected: 4,
            actual: 3
        }
    ));
}

#[test]
fn test_verification_is_repeatable() {
    let mut tb = Testbench::new(PcapDmaModel::new(), three_buffers()).unwrap();
    tb.run().unwrap();
    let before = tb.memory().lock().unwrap().data.clone();
    let words: Vec<u32> = (0..32).collect();
    tb.verify(0x1000, &words).unwrap();
    tb.verify(0x1000, &words).unwrap();
    assert_eq!(tb.memory().lock().unwrap().data, before);
}

#[test]
fn test_scenario_from_yaml() {
    let yaml = r#"
name: "yaml-three-buffers"
addresses: [0x1000, 0x2000, 0x3000]
block_size: 128
delay_in_irq: 2
data:
  count: 48
memory_size: "16KiB"
expect:
  bursts: 3
  regions:
    - address: 0x1000
      count: 32
    - address: 0x2000
      start: 32
      count: 16
  untouched:
    - address: 0x3000
      words: 32
"#;
    let scenario = ScenarioConfig::from_yaml(yaml).unwrap();
    let mut tb = Testbench::new(PcapDmaModel::new(), scenario).unwrap();
    let report = tb.run().unwrap();
    assert_eq!(report.name, "yaml-three-buffers");
    assert_eq!(report.bursts, 3);
}

#[test]
fn test_boxed_engine() {
    let engine: Box<dyn DmaEngine> = Box::new(PcapDmaModel::new());
    let mut tb = Testbench::new(engine, three_buffers()).unwrap();
    assert_eq!(tb.engine().name(), "pcap_dma");
    assert_eq!(tb.run().unwrap().bursts, 3);
}

#[test]
fn test_undersized_memory_is_a_violation() {
    let mut scenario = three_buffers();
    scenario.memory_size = "8KiB".to_string();
    let mut tb = Testbench::new(PcapDmaModel::new(), scenario).unwrap();
    let err = tb.run().unwrap_err();
    assert!(matches!(err, SimulationError::MemoryViolation(_)));
}
