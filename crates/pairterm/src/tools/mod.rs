//! Tools the agent can invoke against the shared shell.
//!
//! Each tool pairs a static `ToolSpec` (name, JSON parameter schema,
//! approval requirement, display renderers) with an executor. The registry
//! dispatches by name and turns every failure, including unknown names and
//! executor panics, into a `ToolResult` with `success == false`.

mod history;
mod mutable;


use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::history::SharedHistory;

pub use history::{HistoryTool, READ_TERMINAL_HISTORY};
pub use mutable::{CommandRunner, MutableCommandTool, EXECUTE_MUTABLE_COMMAND};

/// Tool arguments as decoded from the model's JSON. Unknown keys are kept.
pub type ToolArgs = Map<String, Value>;

/// Characters of tool output echoed into the log.
const LOG_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("Terminal executor not available")]
    Unavailable,
    #[error("Command '{command}' timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },
    #[error("{0}")]
    Failed(String),
}

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: ToolArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text handed back to the model as the function call output.
    pub fn model_output(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}

pub trait ToolExecutor: Send + Sync {
    fn execute(&self, args: &ToolArgs) -> Result<String, ToolError>;
}

pub type Renderer = fn(&ToolArgs) -> String;

/// Static description of a tool.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: fn() -> Value,
    pub requires_approval: bool,
    pub render: Renderer,
    /// Present exactly when `requires_approval` is set.
    pub render_approval: Option<Renderer>,
}

struct RegisteredTool {
    spec: &'static ToolSpec,
    executor: Box<dyn ToolExecutor>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard catalog: history reader plus mutable command execution.
    pub fn standard(history: SharedHistory, runner: Option<Arc<dyn CommandRunner>>) -> Self {
        let mut registry = Self::new();
        registry.register(&READ_TERMINAL_HISTORY, HistoryTool::new(history));
        registry.register(&EXECUTE_MUTABLE_COMMAND, MutableCommandTool::new(runner));
        registry
    }

    /// Add a tool; a later registration with the same name replaces it.
    pub fn register(&mut self, spec: &'static ToolSpec, executor: impl ToolExecutor + 'static) {
        debug_assert_eq!(
            spec.requires_approval,
            spec.render_approval.is_some(),
            "approval renderer must accompany requires_approval"
        );
        self.tools.retain(|tool| tool.spec.name != spec.name);
        self.tools.push(RegisteredTool {
            spec,
            executor: Box::new(executor),
        });
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.spec.name).collect()
    }

    fn find(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|tool| tool.spec.name == name)
    }

    /// Function tool definitions for the model request.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "name": tool.spec.name,
                    "description": tool.spec.description,
                    "strict": false,
                    "parameters": (tool.spec.parameters)(),
                })
            })
            .collect()
    }

    pub fn requires_approval(&self, name: &str) -> bool {
        self.find(name)
            .is_some_and(|tool| tool.spec.requires_approval)
    }

    pub fn render_call(&self, name: &str, args: &ToolArgs) -> String {
        match self.find(name) {
            Some(tool) => (tool.spec.render)(args),
            None => format!("Unknown tool: {name}"),
        }
    }

    pub fn render_approval(&self, name: &str, args: &ToolArgs) -> String {
        match self.find(name) {
            Some(tool) => match tool.spec.render_approval {
                Some(render) => render(args),
                None => format!("Tool '{name}' requires approval but has no approval renderer"),
            },
            None => format!("Unknown tool: {name}"),
        }
    }

    /// Best-effort check of `args` against the tool's schema.
    ///
    /// Problems are reported, never enforced: the call still runs with the
    /// arguments as given.
    pub fn validate(&self, name: &str, args: &ToolArgs) -> Vec<String> {
        let Some(tool) = self.find(name) else {
            return vec![format!("Unknown tool: {name}")];
        };
        schema_problems(&(tool.spec.parameters)(), args)
    }

    /// Run a tool. Never panics; every failure is a failed `ToolResult`.
    pub fn execute(&self, name: &str, args: &ToolArgs) -> ToolResult {
        let started = Instant::now();
        let args_json = Value::Object(args.clone());
        tracing::info!(tool = name, args = %args_json, "tool call");

        let result = match self.find(name) {
            None => ToolResult::failure(format!("Unknown tool: {name}")),
            Some(tool) => {
                for problem in self.validate(name, args) {
                    tracing::warn!(tool = name, problem = %problem, "tool arguments");
                }
                match catch_unwind(AssertUnwindSafe(|| tool.executor.execute(args))) {
                    Ok(Ok(output)) => ToolResult::ok(output),
                    Ok(Err(err)) => ToolResult::failure(err.to_string()),
                    Err(_) => ToolResult::failure(format!("Tool '{name}' panicked")),
                }
            }
        };

        let detail = if result.success {
            preview(&result.output)
        } else {
            result.error.clone().unwrap_or_default()
        };
        tracing::info!(
            tool = name,
            success = result.success,
            result = %detail,
            duration_ms = started.elapsed().as_millis() as u64,
            "tool result"
        );
        result
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn schema_problems(schema: &Value, args: &ToolArgs) -> Vec<String> {
    let mut problems = Vec::new();
    let properties = schema.get("properties").and_then(Value::as_object);
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                problems.push(format!("missing required argument `{key}`"));
            }
        }
    }
    for (key, value) in args {
        let Some(expected) = properties
            .and_then(|props| props.get(key))
            .and_then(|prop| prop.get("type"))
            .and_then(Value::as_str)
        else {
            if properties.is_some() {
                problems.push(format!("unexpected argument `{key}`"));
            }
            continue;
        };
        let matches = match expected {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        };
        if !matches {
            problems.push(format!("argument `{key}` should be a {expected}"));
        }
    }
    problems
}

/// Read a non-negative integer argument, accepting whole floats.
pub(crate) fn arg_count(args: &ToolArgs, key: &str) -> Option<usize> {
    let value = args.get(key)?;
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|number| *number >= 0.0 && number.is_finite())
                .map(|number| number as u64)
        })
        .map(|number| number as usize)
}

pub(crate) fn arg_str<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub(crate) fn arg_bool(args: &ToolArgs, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}
