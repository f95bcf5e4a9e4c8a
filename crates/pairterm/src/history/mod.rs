//! Command history shared between the terminal pane and the agent.
//!
//! Records are inferred by the tracker (tracker.rs) from keystrokes and
//! shell output. The history keeps the most recent ones in insertion order
//! and formats slices of them as plain text for the model.

mod tracker;


use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};

pub use tracker::{CommandTracker, TimerTicket, TrackerState};

pub const DEFAULT_CAPACITY: usize = 100;
pub const MAX_RECENT: usize = 20;
const OUTPUT_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub input: String,
    pub output: String,
    pub timestamp: DateTime<Local>,
    pub exit_code: Option<i32>,
}

impl CommandRecord {
    pub fn new(input: &str, output: &str, exit_code: Option<i32>) -> Self {
        Self {
            input: input.trim().to_string(),
            output: output.trim().to_string(),
            timestamp: Local::now(),
            exit_code,
        }
    }
}

/// Bounded ring of command records; the oldest is evicted first.
#[derive(Debug)]
pub struct CommandHistory {
    records: VecDeque<CommandRecord>,
    capacity: usize,
}

/// Handle shared between the event loop and the conversation worker.
pub type SharedHistory = Arc<Mutex<CommandHistory>>;

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl CommandHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn shared(self) -> SharedHistory {
        Arc::new(Mutex::new(self))
    }

    pub fn push(&mut self, record: CommandRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Up to `count` records (clamped to 1..=20) after skipping the `skip`
    /// most recent ones. Most recent first.
    pub fn recent(&self, count: usize, skip: usize) -> Vec<CommandRecord> {
        let count = count.clamp(1, MAX_RECENT);
        self.records
            .iter()
            .rev()
            .skip(skip)
            .take(count)
            .cloned()
            .collect()
    }
}

/// Lock a shared history, recovering from a poisoned lock.
pub fn lock(history: &SharedHistory) -> MutexGuard<'_, CommandHistory> {
    history
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Render records as plain text for the model.
pub fn format_for_model(records: &[CommandRecord], no_output: bool) -> String {
    if records.is_empty() {
        return "No terminal commands found in history.".to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let time = record.timestamp.format("%H:%M:%S");
            let exit = record
                .exit_code
                .map(|code| format!(" (exit: {code})"))
                .unwrap_or_default();
            let header = format!("Command {} [{time}{exit}]:", index + 1);
            if no_output {
                format!("{header} {}", record.input)
            } else {
                format!(
                    "{header}\nInput: {}\nOutput: {}\n---",
                    record.input,
                    preview(&record.output)
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(output: &str) -> String {
    let mut chars = output.chars();
    let head: String = chars.by_ref().take(OUTPUT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...[truncated]")
    } else {
        head
    }
}
