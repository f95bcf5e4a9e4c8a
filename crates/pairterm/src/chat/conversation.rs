//! Displayable conversation log.
//!
//! Owned by the event loop and only changed through `apply` (turn events)
//! plus the prompt's own `add_command` and `clear`. Transient entries are
//! replaced rather than accumulated: at most one `Thinking` entry exists, and
//! an approval prompt gives way to its outcome.

use chrono::{DateTime, Local};

use super::orchestrator::TurnEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    User,
    Command,
    Assistant,
    Thinking,
    ToolCall,
    ToolResult,
    ApprovalPending,
    ApprovalGranted,
    ApprovalDenied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub kind: TurnKind,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_thinking(&self) -> bool {
        self.turns.iter().any(|turn| turn.kind == TurnKind::Thinking)
    }

    /// Prompt text of the approval awaiting a decision, if any.
    pub fn pending_approval(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.kind == TurnKind::ApprovalPending)
            .map(|turn| turn.text.as_str())
    }

    /// A `/command` typed into the prompt and sent to the shell.
    pub fn add_command(&mut self, command: &str) {
        self.push(TurnKind::Command, command);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn apply(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::Started(text) => {
                self.push(TurnKind::User, &text);
                self.push_thinking();
            }
            TurnEvent::ToolCall(rendered) => {
                self.remove(TurnKind::Thinking);
                self.push(TurnKind::ToolCall, &rendered);
                self.push_thinking();
            }
            TurnEvent::ApprovalPending(prompt) => {
                self.remove(TurnKind::Thinking);
                self.push(TurnKind::ApprovalPending, &prompt);
            }
            TurnEvent::ApprovalGranted => {
                self.remove(TurnKind::ApprovalPending);
                self.push(TurnKind::ApprovalGranted, "Approved");
                self.push_thinking();
            }
            TurnEvent::ApprovalDenied => {
                self.remove(TurnKind::ApprovalPending);
                self.push(TurnKind::ApprovalDenied, "Rejected");
                self.push_thinking();
            }
            TurnEvent::ToolFailed(text) => {
                self.remove(TurnKind::Thinking);
                self.push(TurnKind::ToolResult, &text);
                self.push_thinking();
            }
            TurnEvent::Completed(text) => {
                self.remove(TurnKind::Thinking);
                if !text.trim().is_empty() {
                    self.push(TurnKind::Assistant, &text);
                }
            }
            TurnEvent::Failed(message) => {
                self.remove(TurnKind::Thinking);
                self.remove(TurnKind::ApprovalPending);
                self.push(TurnKind::Assistant, &format!("Error: {message}"));
            }
        }
    }

    fn push(&mut self, kind: TurnKind, text: &str) {
        self.turns.push(Turn {
            kind,
            text: text.to_string(),
            timestamp: Local::now(),
        });
    }

    fn push_thinking(&mut self) {
        self.remove(TurnKind::Thinking);
        self.push(TurnKind::Thinking, "");
    }

    fn remove(&mut self, kind: TurnKind) {
        self.turns.retain(|turn| turn.kind != kind);
    }
}
