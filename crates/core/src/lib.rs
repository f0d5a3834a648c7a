//! # Stepwise Core
//!
//! Domain types, traits, and error definitions for the Stepwise reasoning loop.
//! This crate has **no transport dependencies**: it defines the transcript
//! model and the two seams the orchestrator talks through.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates:
//! - [`Provider`] — a model backend (`stepwise-providers`)
//! - [`ToolService`] — the tool execution service (`stepwise-tools`)
//!
//! This keeps the loop testable with scripted mocks and keeps the
//! dependency graph pointing inward on core.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, Role, ToolCall, Transcript};
pub use provider::{CompletionConfig, Provider, ToolDefinition};
pub use tool::ToolService;
