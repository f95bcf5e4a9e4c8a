use serde_json::{json, Value};

use crate::history::{self, SharedHistory};

use super::{arg_bool, arg_count, ToolArgs, ToolError, ToolExecutor, ToolSpec};

const DEFAULT_COUNT: usize = 5;

pub static READ_TERMINAL_HISTORY: ToolSpec = ToolSpec {
    name: "read_terminal_history",
    description: "Reads the inputs and outputs of recent terminal commands. Useful for \
understanding what commands were run and their results. For efficient searching, first use \
no_output=true to scan through command history quickly, then zero in on specific commands \
with full output.",
    parameters,
    requires_approval: false,
    render,
    render_approval: None,
};

fn parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "count": {
                "type": "number",
                "description": "Number of recent commands to retrieve (default: 5, max: 20)",
                "minimum": 1,
                "maximum": 20
            },
            "skip": {
                "type": "number",
                "description": "Number of most recent commands to skip (default: 0)",
                "minimum": 0
            },
            "no_output": {
                "type": "boolean",
                "description": "If true, only show command inputs without outputs for efficient scanning (default: false)"
            }
        },
        "additionalProperties": false
    })
}

struct HistoryQuery {
    count: usize,
    skip: usize,
    no_output: bool,
}

impl HistoryQuery {
    fn from_args(args: &ToolArgs) -> Self {
        Self {
            // Zero means "not given", as with a missing key.
            count: arg_count(args, "count")
                .filter(|count| *count > 0)
                .unwrap_or(DEFAULT_COUNT),
            skip: arg_count(args, "skip").unwrap_or(0),
            no_output: arg_bool(args, "no_output"),
        }
    }
}

fn render(args: &ToolArgs) -> String {
    let query = HistoryQuery::from_args(args);
    let skip = if query.skip > 0 {
        format!(", skip={}", query.skip)
    } else {
        String::new()
    };
    let no_output = if query.no_output { ", no_output" } else { "" };
    format!(
        "History({}{skip}{no_output}) → {} lines",
        query.count, query.count
    )
}

pub struct HistoryTool {
    history: SharedHistory,
}

impl HistoryTool {
    pub fn new(history: SharedHistory) -> Self {
        Self { history }
    }
}

impl ToolExecutor for HistoryTool {
    fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let query = HistoryQuery::from_args(args);
        let records = history::lock(&self.history).recent(query.count, query.skip);
        Ok(history::format_for_model(&records, query.no_output))
    }
}
