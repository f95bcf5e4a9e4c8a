//! Heuristic command boundary detection.
//!
//! The shell gives no explicit signal when a command starts or ends. The
//! tracker watches what the user types: Enter marks a submission, and the
//! output that follows is captured until the shell has been quiet for the
//! quiescence window. A long-running command therefore yields a record with
//! only the output seen inside the window, and several commands submitted
//! within one window are merged into a single record. Lines typed during
//! capture are kept only when the terminal echoed them, so input typed at
//! a no-echo prompt (a `sudo` password) never reaches a record.
//!
//! Timers live outside the tracker. Arming returns a `TimerTicket`; the
//! caller reports it back through `on_quiescence` once the delay elapses.
//! Any later arm or `cancel` bumps the generation, so stale tickets are
//! ignored.

use std::time::Duration;

use crate::terminal::sanitize::{plain_text, sanitize_append};

use super::CommandRecord;

/// Upper bound on captured output kept for one record.
const MAX_CAPTURE_CHARS: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    AwaitingCommand,
    CapturingOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub generation: u64,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct CommandTracker {
    state: TrackerState,
    pending_input: String,
    output: String,
    generation: u64,
    quiescence: Duration,
}

impl CommandTracker {
    pub fn new(quiescence: Duration) -> Self {
        Self {
            state: TrackerState::AwaitingCommand,
            pending_input: String::new(),
            output: String::new(),
            generation: 0,
            quiescence,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Observe bytes written to the shell. Returns a ticket when Enter armed
    /// (or re-armed) the quiescence timer.
    pub fn on_keystrokes(&mut self, bytes: &[u8]) -> Option<TimerTicket> {
        let text = String::from_utf8_lossy(bytes);
        let mut chars = text.chars().peekable();
        let mut ticket = None;
        while let Some(ch) = chars.next() {
            match ch {
                '\r' | '\n' => ticket = Some(self.submit()),
                '\u{7f}' | '\u{8}' => {
                    self.pending_input.pop();
                }
                // Ctrl+C and Ctrl+U discard the line being typed.
                '\u{3}' | '\u{15}' if self.state == TrackerState::AwaitingCommand => {
                    self.pending_input.clear();
                }
                '\u{1b}' => match chars.next() {
                    // CSI: parameters then one final byte in @..~
                    Some('[') => {
                        for next in chars.by_ref() {
                            if ('@'..='~').contains(&next) {
                                break;
                            }
                        }
                    }
                    Some('O') => {
                        chars.next();
                    }
                    _ => {}
                },
                ch if ch.is_control() => {}
                ch => self.pending_input.push(ch),
            }
        }
        ticket
    }

    /// Observe sanitizable shell output.
    pub fn on_output(&mut self, chunk: &str) {
        if self.state != TrackerState::CapturingOutput || chunk.is_empty() {
            return;
        }
        self.output = sanitize_append(&self.output, chunk);
        let excess = self.output.chars().count().saturating_sub(MAX_CAPTURE_CHARS);
        if excess > 0 {
            let cut = self
                .output
                .char_indices()
                .nth(excess)
                .map(|(index, _)| index)
                .unwrap_or(self.output.len());
            self.output.drain(..cut);
        }
    }

    /// Quiescence timer fired. Produces a record when the ticket is current
    /// and something non-blank was submitted.
    pub fn on_quiescence(&mut self, generation: u64) -> Option<CommandRecord> {
        if generation != self.generation || self.state != TrackerState::CapturingOutput {
            return None;
        }
        let input = std::mem::take(&mut self.pending_input);
        let output = std::mem::take(&mut self.output);
        self.state = TrackerState::AwaitingCommand;
        if input.trim().is_empty() {
            return None;
        }
        let output = plain_text(&output);
        let input = echoed_input(&input, &output);
        Some(CommandRecord::new(&input, &output, None))
    }

    /// Invalidate any armed timer and drop partial state.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = TrackerState::AwaitingCommand;
        self.pending_input.clear();
        self.output.clear();
    }

    fn submit(&mut self) -> TimerTicket {
        if self.state == TrackerState::AwaitingCommand {
            self.state = TrackerState::CapturingOutput;
            self.output.clear();
        }
        // Keeps commands typed during the window on their own lines.
        if !self.pending_input.is_empty() && !self.pending_input.ends_with('\n') {
            self.pending_input.push('\n');
        }
        self.generation += 1;
        TimerTicket {
            generation: self.generation,
            delay: self.quiescence,
        }
    }
}

// The first line started the capture; later ones must show up in the output.
fn echoed_input(input: &str, output: &str) -> String {
    let mut lines = input.split('\n');
    let mut kept: Vec<&str> = lines.next().into_iter().collect();
    kept.extend(lines.filter(|line| {
        let line = line.trim();
        !line.is_empty() && output.contains(line)
    }));
    kept.join("\n")
}
