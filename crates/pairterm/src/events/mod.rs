//! Application event types.
//!
//! Everything that happens off the event loop thread arrives here: key
//! events from the input thread, PTY chunks from the reader thread, expired
//! quiescence timers, turn progress from the conversation worker, and shell
//! commands requested by the `execute_mutable_command` tool.
//!
//! Events are processed sequentially in the main loop, which owns all
//! UI-side state.

use std::sync::mpsc::Sender;

use crossterm::event::KeyEvent;

use crate::chat::{TurnEvent, TurnSink};

#[derive(Debug)]
pub enum AppEvent {
    Input(KeyEvent),
    Resize(u16, u16),
    PtyOutput(u64, Vec<u8>),
    PtyExit(u64),
    /// Quiescence timer for (session id, tracker generation).
    QuiescenceElapsed(u64, u64),
    Turn(TurnEvent),
    /// Type `command` into the shell and stream sanitized output back.
    RunCommand {
        command: String,
        output_tx: Sender<String>,
    },
}

impl TurnSink for Sender<AppEvent> {
    fn emit(&self, event: TurnEvent) {
        let _ = self.send(AppEvent::Turn(event));
    }
}
