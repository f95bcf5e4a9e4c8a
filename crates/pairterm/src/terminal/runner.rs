//! Running agent commands in the user's shell.
//!
//! The runner never touches the PTY directly. It asks the event loop to
//! type the command (so the tracker records it like any other command) and
//! to forward subsequent output chunks. Completion is a heuristic: the
//! command is done once a prompt-looking marker shows up after the echoed
//! command line.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::events::AppEvent;
use crate::tools::{CommandRunner, ToolError};

use super::sanitize::{plain_text, sanitize};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const PROMPT_MARKERS: [&str; 3] = ["$ ", "% ", "> "];

pub struct PtyCommandRunner {
    event_tx: Sender<AppEvent>,
    timeout: Duration,
}

impl PtyCommandRunner {
    pub fn new(event_tx: Sender<AppEvent>) -> Self {
        Self::with_timeout(event_tx, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(event_tx: Sender<AppEvent>, timeout: Duration) -> Self {
        Self { event_tx, timeout }
    }
}

impl CommandRunner for PtyCommandRunner {
    fn run(&self, command: &str) -> Result<String, ToolError> {
        let (output_tx, output_rx) = mpsc::channel::<String>();
        self.event_tx
            .send(AppEvent::RunCommand {
                command: command.to_string(),
                output_tx,
            })
            .map_err(|_| ToolError::Unavailable)?;

        let deadline = Instant::now() + self.timeout;
        let mut raw = String::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match output_rx.recv_timeout(remaining) {
                Ok(chunk) => {
                    raw.push_str(&chunk);
                    if let Some(output) = completed_output(&raw) {
                        return Ok(output);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ToolError::Timeout {
                        command: command.to_string(),
                        secs: self.timeout.as_secs(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ToolError::Failed("terminal session ended".to_string()));
                }
            }
        }
    }
}

/// Output between the echoed command line and the next prompt, if the
/// prompt has appeared.
fn completed_output(raw: &str) -> Option<String> {
    let text = plain_text(&sanitize(raw)).into_owned();
    let (_, after_echo) = text.split_once('\n')?;
    let mut lines: Vec<&str> = after_echo.split('\n').collect();
    let prompt = lines.last()?;
    if !PROMPT_MARKERS.iter().any(|marker| prompt.contains(marker)) {
        return None;
    }
    lines.pop();
    Some(lines.join("\n").trim().to_string())
}
