//! Agent-level steps.
//!
//! `AgentStep` is what a run reports while it progresses. The gateway
//! forwards each one to clients over SSE as soon as the loop emits it.

use serde::{Deserialize, Serialize};

/// Steps emitted by the reasoning loop.
///
/// Wire names:
/// - `thinking`    — a model call is about to be made
/// - `tool_call`   — the model asked for a tool
/// - `tool_result` — the tool returned a payload
/// - `answer`      — final answer, always the last step of a run
/// - `error`       — model failure, empty answer, or a tool failure
///   (scoped by `tool_name`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStep {
    Thinking { iteration: u32 },

    ToolCall {
        iteration: u32,
        tool_name: String,
        tool_args: serde_json::Value,
        /// The model's stated reason for the call
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    ToolResult {
        iteration: u32,
        tool_name: String,
        result: serde_json::Value,
    },

    Answer { iteration: u32, content: String },

    Error {
        iteration: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        error: String,
    },
}

impl AgentStep {
    /// Wire name for this step type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Answer { .. } => "answer",
            Self::Error { .. } => "error",
        }
    }

    pub fn iteration(&self) -> u32 {
        match self {
            Self::Thinking { iteration }
            | Self::ToolCall { iteration, .. }
            | Self::ToolResult { iteration, .. }
            | Self::Answer { iteration, .. }
            | Self::Error { iteration, .. } => *iteration,
        }
    }
}
