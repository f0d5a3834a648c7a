//! The reasoning loop — the heart of Stepwise.
//!
//! The agent follows a **Think → Act → Observe** cycle:
//!
//! 1. **Receive** a user message and optional prior history
//! 2. **Build context** (system prompt with the tool catalog + transcript)
//! 3. **Send to the model** via the routed backend
//! 4. **If the reply is a tool call**: run it, append the result, loop back to 3
//! 5. **Otherwise**: the reply is the final answer
//!
//! Every step is streamed as an [`AgentStep`] while the loop runs.

pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod step;
pub mod stream;

#[cfg(test)]
mod test_helpers;

pub use orchestrator::{AgentConfig, AgentOrchestrator, RunInput, RunOutcome, Termination};
pub use parser::{clean_answer, parse_tool_call};
pub use prompt::system_prompt_with_tools;
pub use step::AgentStep;
pub use stream::{DecodeError, StreamFrame, decode_line, decode_stream, encode_frame, encode_steps};
