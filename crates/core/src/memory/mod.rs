// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{BurstObserver, WriteTransaction};
use crate::{SimResult, SimulationError};
use std::sync::Mutex;

pub const WORD_SIZE: u64 = 4;

/// Golden model of the memory behind the write bus.
///
/// A flat little-endian byte store starting at address zero. Only whole words
/// at word-aligned addresses are written or checked.
#[derive(Debug, Clone)]
pub struct GoldenMemory {
    pub data: Vec<u8>,
}

impl GoldenMemory {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    fn word_offset(&self, addr: u64) -> SimResult<usize> {
        if addr % WORD_SIZE != 0 {
            return Err(SimulationError::Misaligned(addr));
        }
        match addr.checked_add(WORD_SIZE) {
            Some(end) if end <= self.data.len() as u64 => {}
            _ => return Err(SimulationError::MemoryViolation(addr)),
        }
        Ok(addr as usize)
    }

    pub fn read_word(&self, addr: u64) -> SimResult<u32> {
        let offset = self.word_offset(addr)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    fn check_span(&self, addr: u64, words: usize) -> SimResult<()> {
        self.word_offset(addr)?;
        let end = (words as u64)
            .checked_mul(WORD_SIZE)
            .and_then(|bytes| addr.checked_add(bytes))
            .ok_or(SimulationError::MemoryViolation(addr))?;
        if end > self.data.len() as u64 {
            return Err(SimulationError::MemoryViolation(end - WORD_SIZE));
        }
        Ok(())
    }

    /// Writes `words` back to back starting at `addr`.
    ///
    /// The whole span is checked first; a failed burst leaves memory untouched.
    pub fn apply_burst(&mut self, addr: u64, words: &[u32]) -> SimResult<()> {
        self.check_span(addr, words.len())?;
        let start = addr as usize;
        for (chunk, word) in self.data[start..start + words.len() * 4]
            .chunks_exact_mut(4)
            .zip(words)
        {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Checks the words stored from `addr` onwards, failing on the first mismatch.
    pub fn verify(&self, addr: u64, expected: &[u32]) -> SimResult<()> {
        self.check_span(addr, expected.len())?;
        tracing::debug!(
            "Checking memory region - addr: {:#010X}, size: {}",
            addr,
            expected.len() * 4
        );
        for (i, &want) in expected.iter().enumerate() {
            let at = addr + i as u64 * WORD_SIZE;
            let actual = self.read_word(at)?;
            if actual != want {
                return Err(SimulationError::ContentMismatch {
                    address: at,
                    expected: want,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl BurstObserver for Mutex<GoldenMemory> {
    fn on_burst(&self, txn: &WriteTransaction) -> SimResult<()> {
        let mut memory = self.lock().unwrap_or_else(|e| e.into_inner());
        memory.apply_burst(txn.address as u64, &txn.words)
    }
}
