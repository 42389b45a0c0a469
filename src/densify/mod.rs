//! Turns captured screen text into dense notes through an external model.

mod cli;
mod error;
mod factory;
mod http;
pub mod prompt;
mod provider;
mod retry;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use cli::ClaudeCliDensifier;
pub use error::DensifyError;
pub use factory::{DensifierFactory, ProviderDensifierFactory};
pub use http::{classify_status, AnthropicDensifier, OllamaDensifier, OpenAiDensifier};
pub use provider::Provider;
pub use retry::{densify_with_retry, DensifyOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensifyRequest {
    pub text: String,
    pub app_name: String,
    pub window_title: String,
    pub provider: Provider,
    pub model: String,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensifyOutput {
    pub content: String,
    /// Short title suggested by the model, if it gave one.
    pub title: Option<String>,
}

#[async_trait]
pub trait Densifier: Send + Sync {
    /// One attempt; retries are the caller's concern.
    async fn densify(&self, request: &DensifyRequest) -> Result<DensifyOutput, DensifyError>;

    fn provider(&self) -> Provider;
}
