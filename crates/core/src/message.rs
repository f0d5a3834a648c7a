//! Message and Transcript domain types.
//!
//! These are the value objects that flow through a run:
//! caller supplies history → loop appends user/assistant/tool entries →
//! the transcript is handed back as updated history.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// The role of a message sender in a conversation.
///
/// Closed set: any other value fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (agent prompt + tool catalog)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A structured tool request extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub tool: String,

    /// Arguments as a JSON object
    #[serde(default = "empty_args")]
    pub args: serde_json::Value,

    /// The model's explanation for the call, never needed for execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

fn empty_args() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    #[serde(default)]
    pub content: String,

    /// The tool call this assistant message issued
    #[serde(default, alias = "toolCall", skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    /// Structured payload a tool message reports
    #[serde(default, alias = "toolResult", skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<serde_json::Value>,

    /// Tool name (required on tool messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Correlates a tool message with the assistant message that requested it
    #[serde(default, alias = "toolCallId", skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call: None,
            tool_result: None,
            name: None,
            tool_call_id: None,
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool message. `content` is what text-only backends see.
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Check the role-dependent field rules.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.role {
            Role::Tool => {
                if self.name.as_deref().is_none_or(str::is_empty) {
                    return Err("tool message requires a name".into());
                }
            }
            _ => {
                if self.content.is_empty() {
                    return Err(format!("{:?} message requires content", self.role).to_lowercase());
                }
            }
        }
        if self.tool_call.is_some() && self.role != Role::Assistant {
            return Err("only assistant messages may carry a tool_call".into());
        }
        if self.tool_result.is_some() && self.role != Role::Tool {
            return Err("only tool messages may carry a tool_result".into());
        }
        Ok(())
    }
}

/// Generate a fresh correlation id for pairing a tool call with its result.
pub fn new_correlation_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// The ordered message sequence for one run.
///
/// Append-only: no operation removes or reorders prior entries, so the
/// transcript handed back to the caller replays the run exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from caller-supplied history, validating every entry.
    ///
    /// A system message is only accepted as the first entry.
    pub fn from_history(history: Vec<Message>) -> Result<Self> {
        for (index, message) in history.iter().enumerate() {
            message
                .validate()
                .map_err(|reason| Error::InvalidMessage { index, reason })?;
            if index > 0 && message.role == Role::System {
                return Err(Error::InvalidMessage {
                    index,
                    reason: "system message is only allowed first".into(),
                });
            }
        }
        Ok(Self { messages: history })
    }

    /// Insert the system prompt at position 0 unless one is already there.
    pub fn ensure_system_prompt(&mut self, prompt: &str) {
        if self.messages.first().is_some_and(|m| m.role == Role::System) {
            debug!("System prompt already present, keeping existing");
            return;
        }
        self.messages.insert(0, Message::system(prompt));
    }

    /// Append a user turn.
    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append a model turn, optionally carrying the tool call it issued.
    pub fn append_assistant(
        &mut self,
        text: impl Into<String>,
        tool_call: Option<ToolCall>,
        correlation_id: Option<String>,
    ) {
        let mut message = Message::assistant(text);
        message.tool_call = tool_call;
        message.tool_call_id = correlation_id;
        self.messages.push(message);
    }

    /// Append a successful (or setup-required) tool result.
    ///
    /// The payload is kept structured in `tool_result` and serialised into
    /// `content` for backends that only accept text.
    pub fn append_tool_result(
        &mut self,
        tool_name: &str,
        payload: serde_json::Value,
        correlation_id: impl Into<String>,
    ) {
        let mut message = Message::tool(tool_name, payload.to_string());
        message.tool_result = Some(payload);
        message.tool_call_id = Some(correlation_id.into());
        self.messages.push(message);
    }

    /// Append a failed tool call so the model can react to it next turn.
    pub fn append_tool_error(
        &mut self,
        tool_name: &str,
        error_text: &str,
        correlation_id: impl Into<String>,
    ) {
        let mut message = Message::tool(tool_name, format!("Error: {error_text}"));
        message.tool_call_id = Some(correlation_id.into());
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Hand the history back to the caller.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
        assert!(msg.tool_call.is_none());
    }

    #[test]
    fn unknown_role_rejected() {
        let result: std::result::Result<Message, _> =
            serde_json::from_str(r#"{"role":"narrator","content":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let msg: Message = serde_json::from_str(
            r#"{"role":"tool","content":"{}","name":"search_files","toolCallId":"call_1","toolResult":{"files":[]}}"#,
        )
        .unwrap();
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.tool_result, Some(json!({"files": []})));
    }

    #[test]
    fn tool_message_without_name_is_invalid() {
        let mut msg = Message::tool("x", "ok");
        msg.name = None;
        assert!(msg.validate().is_err());
    }

    #[test]
    fn tool_message_may_have_empty_content() {
        assert!(Message::tool("search_files", "").validate().is_ok());
        assert!(Message::user("").validate().is_err());
    }

    #[test]
    fn tool_call_only_on_assistant() {
        let mut msg = Message::user("hi");
        msg.tool_call = Some(ToolCall {
            tool: "t".into(),
            args: json!({}),
            reasoning: None,
        });
        assert!(msg.validate().is_err());
    }

    #[test]
    fn system_prompt_inserted_once() {
        let mut transcript = Transcript::new();
        transcript.append_user("hi");
        transcript.ensure_system_prompt("You are helpful.");
        transcript.ensure_system_prompt("You are helpful.");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].role, Role::System);
        assert_eq!(
            transcript
                .messages()
                .iter()
                .filter(|m| m.role == Role::System)
                .count(),
            1
        );
    }

    #[test]
    fn replayed_history_keeps_its_system_prompt() {
        let history = vec![Message::system("original"), Message::user("earlier")];
        let mut transcript = Transcript::from_history(history).unwrap();
        transcript.ensure_system_prompt("replacement");
        assert_eq!(transcript.messages()[0].content, "original");
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn from_history_rejects_invalid_entry() {
        let history = vec![Message::user("ok"), Message::assistant("")];
        let err = Transcript::from_history(history).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage { index: 1, .. }));
    }

    #[test]
    fn from_history_rejects_late_system_message() {
        let history = vec![Message::user("q"), Message::system("late sys")];
        let err = Transcript::from_history(history).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage { index: 1, .. }));
    }

    #[test]
    fn tool_result_is_serialised_into_content() {
        let mut transcript = Transcript::new();
        transcript.append_tool_result("search_files", json!({"files": []}), "call_1");

        let msg = &transcript.messages()[0];
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.name.as_deref(), Some("search_files"));
        assert_eq!(msg.content, r#"{"files":[]}"#);
        assert_eq!(msg.tool_result, Some(json!({"files": []})));
    }

    #[test]
    fn tool_error_is_prefixed() {
        let mut transcript = Transcript::new();
        transcript.append_tool_error("send_email", "SMTP down", "call_2");
        assert_eq!(transcript.messages()[0].content, "Error: SMTP down");
        assert!(transcript.messages()[0].tool_result.is_none());
    }

    #[test]
    fn correlation_ids_are_unique() {
        assert_ne!(new_correlation_id(), new_correlation_id());
    }
}
