use std::sync::Arc;

use serde_json::{json, Value};

use super::{arg_str, ToolArgs, ToolError, ToolExecutor, ToolSpec};

/// Characters of command output returned to the model (most recent kept).
const MAX_COMMAND_OUTPUT_CHARS: usize = 500;

/// Runs a command line in the user's shell and returns what it printed.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> Result<String, ToolError>;
}

pub static EXECUTE_MUTABLE_COMMAND: ToolSpec = ToolSpec {
    name: "execute_mutable_command",
    description: "Executes commands that may mutate the terminal or system state. Use this for \
commands like file creation, deletion, system changes, installations, etc. This tool requires \
user approval before execution.",
    parameters,
    requires_approval: true,
    render,
    render_approval: Some(render_approval),
};

fn parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "command": {
                "type": "string",
                "description": "The shell command to execute (e.g., \"npm install\", \"rm file.txt\", \"git commit -m \\\"message\\\"\")"
            },
            "reason": {
                "type": "string",
                "description": "Brief explanation of why this command needs to be run and what it will do"
            }
        },
        "required": ["command", "reason"],
        "additionalProperties": false
    })
}

fn render(args: &ToolArgs) -> String {
    let command = arg_str(args, "command").unwrap_or_default();
    let reason = arg_str(args, "reason").unwrap_or_default();
    format!("Execute({command}) → {reason}")
}

fn render_approval(args: &ToolArgs) -> String {
    let command = arg_str(args, "command").unwrap_or_default();
    let reason = arg_str(args, "reason").unwrap_or_default();
    format!("Execute '{command}'? ({reason}) [Enter=Yes, Esc=No]")
}

pub struct MutableCommandTool {
    runner: Option<Arc<dyn CommandRunner>>,
}

impl MutableCommandTool {
    pub fn new(runner: Option<Arc<dyn CommandRunner>>) -> Self {
        Self { runner }
    }
}

impl ToolExecutor for MutableCommandTool {
    fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let command = arg_str(args, "command")
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Command is required".to_string()))?;
        let runner = self.runner.as_ref().ok_or(ToolError::Unavailable)?;
        let output = runner.run(command).map_err(|err| {
            tracing::error!(command, error = %err, "command execution failed");
            ToolError::Failed(format!("Failed to execute command: {err}"))
        })?;
        Ok(keep_tail(&output, MAX_COMMAND_OUTPUT_CHARS))
    }
}

fn keep_tail(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(total - max_chars).collect();
    format!("...{tail}")
}
