//! Tool execution client for Stepwise.
//!
//! Tools do not run in this process. A separate tool service exposes
//! `GET /tools` (the catalog) and `POST /execute` (run one tool), and
//! [`ToolServiceClient`] implements `stepwise_core::ToolService` over it.

pub mod client;
pub mod envelope;

pub use client::{ToolServiceClient, fetch_catalog_or_empty};
pub use envelope::{ExecuteEnvelope, classify_envelope};

/// Default per-call timeout for the tool service.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
