//! Conversation with the model, including the approval-gated tool loop.
//!
//! Submodules:
//! - api: wire types and the HTTP client
//! - approval: single-slot human approval rendezvous
//! - orchestrator: drives one turn through the tool loop
//! - conversation: the displayable log built from turn events

mod api;
mod approval;
mod conversation;
mod orchestrator;

use std::time::Duration;

use thiserror::Error;

pub use api::{InputItem, ModelClient, ModelRequest, ModelResponse, OutputItem, ResponsesClient};
pub use approval::{ApprovalError, ApprovalGate, Decision};
pub use conversation::{Conversation, Turn, TurnKind};
pub use orchestrator::{ChatOrchestrator, OrchestratorConfig, TurnEvent, TurnSink};

pub const INITIAL_INSTRUCTIONS: &str = "You are a helpful assistant integrated into a terminal application.
- When the user asks you to do things they imagine you're their intern on the keyboard in front of a terminal.
- If they ask you to do something that can be accomplished in the terminal, do so. Use your tools.
- If they've affirmatively asked for something that can be provided by running tools against the terminal, do so.
- If you run into errors, try to fix them yourself, as a high agency intern would.
- If you do not have enough information to do something, run commands to understand the user's environment.
- Provide clear, concise responses to help the user with their questions and tasks.";

pub const TOOL_FOLLOWUP_INSTRUCTIONS: &str = "Continue the conversation with the tool results.";

/// Output handed to the model when the user rejects a tool call.
pub const REJECTED_TOOL_OUTPUT: &str = "Tool execution was rejected by user";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
    #[error("stopped after {0} tool rounds without a final answer")]
    RoundLimit(usize),
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error("no API key configured; set PAIRTERM_API_KEY or [model] api_key")]
    MissingApiKey,
}
