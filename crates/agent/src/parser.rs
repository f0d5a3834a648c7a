//! Tool-call extraction from model text.
//!
//! The model asks for a tool by writing a JSON object with `tool` and
//! `args` keys somewhere in its reply. Anything else is a final answer.

use serde_json::Value;
use stepwise_core::message::ToolCall;
use tracing::debug;

/// Extract a tool call from raw model output.
///
/// Takes the span from the first `{` to the last `}` and parses it as one
/// object. Text that does not parse, or parses to an object without both
/// `tool` and `args`, is not a call.
pub fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let data: Value = match serde_json::from_str(&text[start..=end]) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Response contains braces but no parseable tool call");
            return None;
        }
    };

    let obj = data.as_object()?;
    if !obj.contains_key("tool") || !obj.contains_key("args") {
        return None;
    }

    let tool = obj.get("tool").and_then(Value::as_str)?;
    if tool.is_empty() {
        return None;
    }

    let args = match obj.get("args") {
        Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
        Some(args @ Value::Object(_)) => args.clone(),
        Some(_) => {
            debug!(tool, "Tool call args are not an object, treating reply as text");
            return None;
        }
    };

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .map(String::from);

    Some(ToolCall {
        tool: tool.to_string(),
        args,
        reasoning,
    })
}

/// Strip role labels the model echoed at the start of its answer.
pub fn clean_answer(text: &str) -> String {
    const LABELS: [&str; 2] = ["**assistant:**", "assistant:"];

    let mut rest = text.trim();
    loop {
        let lowered = rest.to_ascii_lowercase();
        let Some(label) = LABELS.iter().find(|l| lowered.starts_with(*l)) else {
            break;
        };
        rest = rest[label.len()..].trim_start();
    }
    rest.trim_end().to_string()
}
