// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clocked signal line.
///
/// Readers always see the value settled at the last tick boundary; the single
/// driver of the line writes the value it wants after the next boundary.
/// [`Wire::commit`] moves the driven value across the boundary. A line that is
/// not driven again keeps its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wire<T> {
    current: T,
    next: T,
}

impl<T: Copy> Wire<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            next: value,
        }
    }

    /// Value sampled at this tick.
    pub fn get(&self) -> T {
        self.current
    }

    pub fn set(&mut self, value: T) {
        self.next = value;
    }

    /// Value that becomes visible at the next tick.
    pub fn driven(&self) -> T {
        self.next
    }

    pub fn commit(&mut self) {
        self.current = self.next;
    }
}

/// Detects low-to-high transitions of a level signal sampled once per tick.
#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    last: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds this tick's level; returns true on a rising edge.
    pub fn sample(&mut self, level: bool) -> bool {
        let rose = level && !self.last;
        self.last = level;
        rose
    }
}

/// One-shot event: set at most once, observed any number of times.
///
/// Clones share the same flag, so the owner can hand out waiters.
#[derive(Debug, Clone, Default)]
pub struct ReadinessEvent {
    flag: Arc<AtomicBool>,
}

impl ReadinessEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the event had already fired.
    pub fn set(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
