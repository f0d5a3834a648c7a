//! The `/execute` response envelope and its classification.
//!
//! The service answers every call with `{result, error}`. A populated
//! `error` is a hard failure unless `result` flags that the tool needs
//! setup first; that case is handed back as a normal result so the model
//! can relay the setup instructions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepwise_core::error::ToolError;

/// Body returned by `POST /execute`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteEnvelope {
    #[serde(default)]
    pub result: Value,

    #[serde(default)]
    pub error: Option<Value>,
}

/// Classify an envelope into a result payload or a hard failure.
pub fn classify_envelope(tool_name: &str, envelope: ExecuteEnvelope) -> Result<Value, ToolError> {
    let Some(error) = error_text(envelope.error.as_ref()) else {
        return Ok(match envelope.result {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        });
    };

    if setup_required(&envelope.result) {
        return Ok(envelope.result);
    }

    Err(ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason: error,
    })
}

/// `None` for an absent, null or empty error.
fn error_text(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn setup_required(result: &Value) -> bool {
    let Some(obj) = result.as_object() else {
        return false;
    };
    ["setupRequired", "setup_required"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .any(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
