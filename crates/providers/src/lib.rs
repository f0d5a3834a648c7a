//! Model backend implementations for Stepwise.
//!
//! All backends implement the `stepwise_core::Provider` trait.
//! The router picks one per run from the model identifier.

pub mod anthropic;
mod http;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{BackendKind, ProviderRouter, ResolvedModel, build_from_config, resolve_backend};

/// Default per-call timeout for every backend.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;

    /// Serve `router` on an ephemeral local port and return its base URL.
    pub async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }
}
