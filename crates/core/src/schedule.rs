// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Tick-exact step programs for the clocked agents.
//!
//! An agent's behavior is a queue of steps: zero-time actions and explicit
//! waits for a number of clock ticks. An action can also block, in which case
//! it is retried on every following tick until it lets the program continue.

use crate::SimResult;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<A> {
    /// Suspend for this many ticks. `Wait(0)` is a no-op.
    Wait(u32),
    Do(A),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Keep the action at the head of the program and retry next tick.
    Block,
}

#[derive(Debug, Clone)]
pub struct Program<A> {
    steps: VecDeque<Step<A>>,
    waiting: u32,
}

impl<A> Default for Program<A> {
    fn default() -> Self {
        Self {
            steps: VecDeque::new(),
            waiting: 0,
        }
    }
}

impl<A> Program<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(&mut self, ticks: u32) {
        self.steps.push_back(Step::Wait(ticks));
    }

    pub fn then(&mut self, action: A) {
        self.steps.push_back(Step::Do(action));
    }

    /// Nothing queued and not suspended.
    pub fn is_idle(&self) -> bool {
        self.steps.is_empty() && self.waiting == 0
    }

    /// Advances by one clock tick: burns one tick of the current wait, then
    /// runs actions until the next wait or a blocked action.
    pub fn on_tick<F>(&mut self, exec: F) -> SimResult<()>
    where
        F: FnMut(&A) -> SimResult<Flow>,
    {
        if self.waiting > 0 {
            self.waiting -= 1;
            if self.waiting > 0 {
                return Ok(());
            }
        }
        self.run(exec)
    }

    /// Runs ready actions within the current tick without consuming a wait.
    pub fn run<F>(&mut self, mut exec: F) -> SimResult<()>
    where
        F: FnMut(&A) -> SimResult<Flow>,
    {
        while self.waiting == 0 {
            let Some(step) = self.steps.pop_front() else {
                break;
            };
            match step {
                Step::Wait(ticks) => self.waiting = ticks,
                Step::Do(action) => match exec(&action)? {
                    Flow::Continue => {}
                    Flow::Block => {
                        self.steps.push_front(Step::Do(action));
                        break;
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waits_are_tick_exact() {
        let mut program = Program::new();
        program.then('a');
        program.wait(2);
        program.then('b');
        program.wait(1);
        program.then('c');

        let mut seen = Vec::new();
        program
            .run(|a| {
                seen.push(*a);
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(seen, vec!['a']);

        let tick = |program: &mut Program<char>, seen: &mut Vec<char>| {
            program
                .on_tick(|a| {
                    seen.push(*a);
                    Ok(Flow::Continue)
                })
                .unwrap();
        };

        tick(&mut program, &mut seen);
        assert_eq!(seen, vec!['a']);
        tick(&mut program, &mut seen);
        assert_eq!(seen, vec!['a', 'b']);
        tick(&mut program, &mut seen);
        assert_eq!(seen, vec!['a', 'b', 'c']);
        assert!(program.is_idle());
    }

    #[test]
    fn test_blocked_action_is_retried() {
        let mut program = Program::new();
        program.then(3u32);
        program.then(0u32);

        let mut polls = 0;
        let mut done = Vec::new();
        for _ in 0..5 {
            program
                .on_tick(|n| {
                    if *n > 0 {
                        polls += 1;
                        if polls < *n {
                            return Ok(Flow::Block);
                        }
                    }
                    done.push(*n);
                    Ok(Flow::Continue)
                })
                .unwrap();
        }
        assert_eq!(polls, 3);
        assert_eq!(done, vec![3, 0]);
        assert!(program.is_idle());
    }

    #[test]
    fn test_zero_wait_does_not_suspend() {
        let mut program = Program::new();
        program.wait(0);
        program.then(1u8);
        let mut ran = false;
        program
            .run(|_| {
                ran = true;
                Ok(Flow::Continue)
            })
            .unwrap();
        assert!(ran);
    }
}
