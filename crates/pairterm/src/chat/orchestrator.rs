//! Drives one conversation turn through the tool loop.
//!
//! A turn sends the user's message, then alternates between executing the
//! function calls in a response (strictly one after another, in the order
//! returned) and submitting their outputs, until a response arrives with no
//! function calls. Each model request is raced against the configured
//! timeout. Any error aborts the turn; outputs gathered so far are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::logging::Logger;
use crate::tools::{ToolArgs, ToolCall, ToolRegistry};

use super::{
    ApprovalGate, ChatError, Decision, InputItem, ModelClient, ModelRequest, ModelResponse,
    OutputItem, INITIAL_INSTRUCTIONS, REJECTED_TOOL_OUTPUT, TOOL_FOLLOWUP_INSTRUCTIONS,
};

/// Progress of a turn, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Started(String),
    ToolCall(String),
    ApprovalPending(String),
    ApprovalGranted,
    ApprovalDenied,
    ToolFailed(String),
    Completed(String),
    Failed(String),
}

pub trait TurnSink: Send {
    fn emit(&self, event: TurnEvent);
}

impl TurnSink for Sender<TurnEvent> {
    fn emit(&self, event: TurnEvent) {
        let _ = self.send(event);
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub model: String,
    pub timeout: Duration,
    pub max_tool_rounds: usize,
    pub instructions: String,
    pub followup_instructions: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            timeout: Duration::from_secs(120),
            max_tool_rounds: 16,
            instructions: INITIAL_INSTRUCTIONS.to_string(),
            followup_instructions: TOOL_FOLLOWUP_INSTRUCTIONS.to_string(),
        }
    }
}

#[derive(Default)]
struct Session {
    previous_response_id: Option<String>,
    messages: Vec<InputItem>,
    /// Bumped by `clear`; a turn only writes back state from its own epoch.
    epoch: u64,
}

pub struct ChatOrchestrator {
    client: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    gate: ApprovalGate,
    config: OrchestratorConfig,
    session: Mutex<Session>,
    busy: AtomicBool,
    logger: Logger,
}

impl ChatOrchestrator {
    pub fn new(
        client: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        gate: ApprovalGate,
        config: OrchestratorConfig,
        logger: Logger,
    ) -> Self {
        Self {
            client,
            tools,
            gate,
            config,
            session: Mutex::new(Session::default()),
            busy: AtomicBool::new(false),
            logger,
        }
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start a turn on a worker thread. Returns false (and does nothing)
    /// while another turn is in flight.
    pub fn send_message<S>(self: &Arc<Self>, text: &str, sink: S) -> bool
    where
        S: TurnSink + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("message ignored while a turn is in flight");
            return false;
        }
        let this = Arc::clone(self);
        let text = text.to_string();
        thread::spawn(move || {
            let _log = this.logger.enter();
            let outcome = this.run_turn(&text, &sink);
            match outcome {
                Ok(reply) => sink.emit(TurnEvent::Completed(reply)),
                Err(err) => sink.emit(TurnEvent::Failed(err.to_string())),
            }
            this.busy.store(false, Ordering::SeqCst);
        });
        true
    }

    /// Forget the conversation, including the response-continuity id.
    pub fn clear(&self) {
        {
            let mut session = self.session();
            session.previous_response_id = None;
            session.messages.clear();
            session.epoch += 1;
        }
        self.gate.cancel();
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one turn to completion on the calling thread.
    pub fn run_turn(&self, text: &str, sink: &dyn TurnSink) -> Result<String, ChatError> {
        sink.emit(TurnEvent::Started(text.to_string()));
        let (start_id, epoch) = {
            let session = self.session();
            (session.previous_response_id.clone(), session.epoch)
        };
        let outcome = self.drive(text, epoch, sink);
        match &outcome {
            Ok(reply) => tracing::info!(reply_chars = reply.chars().count(), "turn completed"),
            Err(err) => {
                tracing::warn!(error = %err, "turn failed");
                // The server may hold a response with unanswered calls.
                let mut session = self.session();
                if session.epoch == epoch {
                    session.previous_response_id = start_id;
                }
            }
        }
        outcome
    }

    fn drive(&self, text: &str, epoch: u64, sink: &dyn TurnSink) -> Result<String, ChatError> {
        let input = {
            let mut session = self.session();
            let message = InputItem::user_text(text);
            session.messages.push(message.clone());
            if session.previous_response_id.is_some() {
                vec![message]
            } else {
                session.messages.clone()
            }
        };

        let mut response = self.request(input, &self.config.instructions, epoch)?;
        let mut rounds = 0;
        loop {
            if !response.has_function_calls() {
                return Ok(response.text());
            }
            let outputs = self.run_tool_calls(&response, sink)?;
            if rounds >= self.config.max_tool_rounds {
                return Err(ChatError::RoundLimit(self.config.max_tool_rounds));
            }
            rounds += 1;
            response = self.request(outputs, &self.config.followup_instructions, epoch)?;
        }
    }

    fn request(
        &self,
        input: Vec<InputItem>,
        instructions: &str,
        epoch: u64,
    ) -> Result<ModelResponse, ChatError> {
        let request = ModelRequest {
            model: self.config.model.clone(),
            instructions: instructions.to_string(),
            input,
            tools: self.tools.definitions(),
            tool_choice: Some("auto".to_string()),
            previous_response_id: self.session().previous_response_id.clone(),
            store: true,
            stream: false,
            parallel_tool_calls: false,
        };

        let (tx, rx) = mpsc::channel();
        let client = Arc::clone(&self.client);
        let logger = self.logger.clone();
        thread::spawn(move || {
            let _log = logger.enter();
            let _ = tx.send(client.create(&request));
        });
        let response = match rx.recv_timeout(self.config.timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(ChatError::Timeout(self.config.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ChatError::Transport(
                    "model request ended without a response".to_string(),
                ))
            }
        };
        let mut session = self.session();
        if session.epoch == epoch {
            session.previous_response_id = Some(response.id.clone());
        }
        Ok(response)
    }

    /// Execute every function call in `response`, in order.
    fn run_tool_calls(
        &self,
        response: &ModelResponse,
        sink: &dyn TurnSink,
    ) -> Result<Vec<InputItem>, ChatError> {
        let mut outputs = Vec::new();
        for item in &response.output {
            let OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } = item
            else {
                continue;
            };
            let call = ToolCall {
                id: call_id.clone(),
                name: name.clone(),
                args: parse_arguments(name, arguments)?,
            };
            let output = self.run_tool_call(&call, sink)?;
            outputs.push(InputItem::function_output(call_id.clone(), output));
        }
        Ok(outputs)
    }

    fn run_tool_call(&self, call: &ToolCall, sink: &dyn TurnSink) -> Result<String, ChatError> {
        let rendered = self.tools.render_call(&call.name, &call.args);
        if self.tools.requires_approval(&call.name) {
            let prompt = self.tools.render_approval(&call.name, &call.args);
            let pending = self.gate.open(call)?;
            sink.emit(TurnEvent::ApprovalPending(prompt));
            match pending.wait()? {
                Decision::Approved => sink.emit(TurnEvent::ApprovalGranted),
                Decision::Rejected => {
                    sink.emit(TurnEvent::ApprovalDenied);
                    return Ok(REJECTED_TOOL_OUTPUT.to_string());
                }
            }
        }
        sink.emit(TurnEvent::ToolCall(rendered));
        let result = self.tools.execute(&call.name, &call.args);
        if let Some(error) = result.error.as_ref().filter(|_| !result.success) {
            sink.emit(TurnEvent::ToolFailed(format!("Error: {error}")));
        }
        Ok(result.model_output())
    }
}

fn parse_arguments(name: &str, arguments: &str) -> Result<ToolArgs, ChatError> {
    if arguments.trim().is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(args)) => Ok(args),
        Ok(other) => Err(ChatError::MalformedResponse(format!(
            "arguments for {name} are not an object: {other}"
        ))),
        Err(err) => Err(ChatError::MalformedResponse(format!(
            "arguments for {name} are not valid JSON: {err}"
        ))),
    }
}
