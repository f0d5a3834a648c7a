//! Step stream encoding.
//!
//! A run is streamed as Server-Sent Events: one `data: <json>` line per
//! step, a blank line after each, and a final `{"type":"done"}` frame.

use serde_json::Value;

use crate::step::AgentStep;

const DATA_PREFIX: &str = "data:";
const DONE_JSON: &str = r#"{"type":"done"}"#;

/// One frame of the stream: a step, or the end-of-run sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Step(AgentStep),
    Done,
}

impl StreamFrame {
    /// The JSON payload of this frame.
    pub fn to_json(&self) -> String {
        match self {
            Self::Step(step) => serde_json::to_string(step).unwrap_or_else(|e| {
                serde_json::json!({
                    "type": "error",
                    "iteration": step.iteration(),
                    "error": format!("Failed to encode step: {e}"),
                })
                .to_string()
            }),
            Self::Done => DONE_JSON.to_string(),
        }
    }
}

/// Errors decoding a stream line.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode one frame as an SSE event.
pub fn encode_frame(frame: &StreamFrame) -> String {
    format!("{DATA_PREFIX} {}\n\n", frame.to_json())
}

/// Encode a finished run: every step, then the `done` sentinel.
pub fn encode_steps(steps: &[AgentStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&encode_frame(&StreamFrame::Step(step.clone())));
    }
    out.push_str(&encode_frame(&StreamFrame::Done));
    out
}

/// Decode one line of an SSE stream.
///
/// Blank lines, comments and non-`data:` fields yield `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<StreamFrame>, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(data)?;
    if value.get("type").and_then(Value::as_str) == Some("done") {
        return Ok(Some(StreamFrame::Done));
    }
    Ok(Some(StreamFrame::Step(serde_json::from_value(value)?)))
}

/// Decode a whole stream body. Stops at the `done` sentinel.
pub fn decode_stream(body: &str) -> Result<Vec<StreamFrame>, DecodeError> {
    let mut frames = Vec::new();
    for line in body.lines() {
        if let Some(frame) = decode_line(line)? {
            let done = frame == StreamFrame::Done;
            frames.push(frame);
            if done {
                break;
            }
        }
    }
    Ok(frames)
}
