// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::ports::FeedPins;
use crate::schedule::{Flow, Program};
use crate::{SimResult, SimulationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedAction {
    Strobe(bool),
    Present(u32),
    Done(bool),
}

/// Pushes words into the engine's data port.
///
/// Requests queue up and run back to back: a `finish` queued behind a `send`
/// starts on the tick the send releases the write strobe.
#[derive(Debug, Default)]
pub struct DataFeedDriver {
    program: Program<FeedAction>,
    words_sent: u64,
}

impl DataFeedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives the idle state of the data port.
    pub fn attach(&self, pins: &mut FeedPins) {
        pins.data.set(0);
        pins.wstb.set(false);
        pins.done.set(false);
    }

    /// Queues `words`, one per tick with the write strobe held high.
    ///
    /// With `synchronize` the strobe goes up on the next tick boundary rather
    /// than in the current tick.
    pub fn send(&mut self, words: &[u32], synchronize: bool) -> SimResult<()> {
        if words.is_empty() {
            return Err(SimulationError::Config(
                "send needs at least one word".to_string(),
            ));
        }
        if synchronize {
            self.program.wait(1);
        }
        self.program.then(FeedAction::Strobe(true));
        for &word in words {
            self.program.then(FeedAction::Present(word));
            self.program.wait(1);
        }
        self.program.then(FeedAction::Strobe(false));
        Ok(())
    }

    /// Queues the end-of-stream pulse: `done` high for exactly one tick.
    pub fn finish(&mut self) {
        self.program.then(FeedAction::Done(true));
        self.program.wait(1);
        self.program.then(FeedAction::Done(false));
        self.program.wait(1);
    }

    /// Nothing left to drive.
    pub fn is_idle(&self) -> bool {
        self.program.is_idle()
    }

    pub fn words_sent(&self) -> u64 {
        self.words_sent
    }

    pub fn tick(&mut self, pins: &mut FeedPins) -> SimResult<()> {
        let sent = &mut self.words_sent;
        self.program.on_tick(|action| Ok(apply(*action, pins, sent)))
    }

    /// Runs queued work that is due in the current tick.
    pub fn resume(&mut self, pins: &mut FeedPins) -> SimResult<()> {
        let sent = &mut self.words_sent;
        self.program.run(|action| Ok(apply(*action, pins, sent)))
    }
}

fn apply(action: FeedAction, pins: &mut FeedPins, sent: &mut u64) -> Flow {
    match action {
        FeedAction::Strobe(level) => pins.wstb.set(level),
        FeedAction::Present(word) => {
            pins.data.set(word);
            *sent += 1;
        }
        FeedAction::Done(level) => pins.done.set(level),
    }
    Flow::Continue
}
