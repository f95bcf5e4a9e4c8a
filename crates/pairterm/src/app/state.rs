//! Application state types and core data structures.
//!
//! The App struct holds all UI-side state. It is owned by the event loop
//! thread; the conversation worker only reaches it through `AppEvent`s and
//! the shared command history.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::chat::{ChatOrchestrator, Conversation};
use crate::config::Config;
use crate::events::AppEvent;
use crate::history::{CommandTracker, SharedHistory};
use crate::keymap::KeyChord;
use crate::terminal::PtySession;

/// Which pane receives keys that are not app-level bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Keys are encoded and written to the shell.
    Terminal,
    /// Keys edit the prompt and answer approvals.
    Chat,
}

impl Focus {
    pub fn toggled(self) -> Self {
        match self {
            Focus::Terminal => Focus::Chat,
            Focus::Chat => Focus::Terminal,
        }
    }
}

pub struct App {
    pub focus: Focus,
    pub should_quit: bool,
    pub config: Config,
    pub event_tx: Sender<AppEvent>,
    pub session: PtySession,
    pub tracker: CommandTracker,
    pub history: SharedHistory,
    pub conversation: Conversation,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub prompt_input: String,
    /// Output listeners for commands the agent is running in the shell.
    pub command_taps: Vec<Sender<String>>,
    pub toggle_chord: Option<KeyChord>,
    pub quit_chord: Option<KeyChord>,
    pub status: Option<String>,
}

impl App {
    /// Set the message shown in the status line.
    pub fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        let trimmed = message.trim();
        self.status = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
}

/// Session id of the single shell.
pub const SHELL_SESSION_ID: u64 = 1;
/// Share of the width given to the terminal pane.
pub const TERMINAL_PANE_PERCENT: u16 = 60;
/// Height of the prompt box, borders included.
pub const PROMPT_HEIGHT: u16 = 3;
