// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{BurstObserver, WriteTransaction};
use crate::SimResult;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Write traffic counters, fed as a burst observer.
#[derive(Debug, Default)]
pub struct BusMetrics {
    burst_count: AtomicU64,
    beat_count: AtomicU64,
    longest_burst: AtomicU64,
    beats_by_address: Mutex<BTreeMap<u32, u64>>,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.burst_count.store(0, Ordering::SeqCst);
        self.beat_count.store(0, Ordering::SeqCst);
        self.longest_burst.store(0, Ordering::SeqCst);
        if let Ok(mut m) = self.beats_by_address.lock() {
            m.clear();
        }
    }

    pub fn get_bursts(&self) -> u64 {
        self.burst_count.load(Ordering::SeqCst)
    }

    pub fn get_beats(&self) -> u64 {
        self.beat_count.load(Ordering::SeqCst)
    }

    pub fn get_longest_burst(&self) -> u64 {
        self.longest_burst.load(Ordering::SeqCst)
    }

    /// Beats written by bursts starting at exactly `address`.
    pub fn get_beats_at(&self, address: u32) -> u64 {
        self.beats_by_address
            .lock()
            .ok()
            .and_then(|m| m.get(&address).copied())
            .unwrap_or(0)
    }

    pub fn burst_addresses(&self) -> Vec<u32> {
        self.beats_by_address
            .lock()
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl BurstObserver for BusMetrics {
    fn on_burst(&self, txn: &WriteTransaction) -> SimResult<()> {
        let beats = txn.words.len() as u64;
        self.burst_count.fetch_add(1, Ordering::SeqCst);
        self.beat_count.fetch_add(beats, Ordering::SeqCst);
        self.longest_burst.fetch_max(beats, Ordering::SeqCst);
        if let Ok(mut m) = self.beats_by_address.lock() {
            *m.entry(txn.address).or_insert(0) += beats;
        }
        Ok(())
    }
}
