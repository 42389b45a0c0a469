use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::config::DensifyConfig;

use super::cli::ClaudeCliDensifier;
use super::http::{AnthropicDensifier, OllamaDensifier, OpenAiDensifier};
use super::{Densifier, Provider};

/// Picks the [`Densifier`] for a provider.
pub trait DensifierFactory: Send + Sync {
    fn densifier(&self, provider: Provider) -> Arc<dyn Densifier>;
}

/// Builds real provider clients sharing one HTTP connection pool.
pub struct ProviderDensifierFactory {
    client: Client,
    config: DensifyConfig,
}

impl ProviderDensifierFactory {
    pub fn new(config: DensifyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build densifier HTTP client")?;
        Ok(Self { client, config })
    }
}

impl DensifierFactory for ProviderDensifierFactory {
    fn densifier(&self, provider: Provider) -> Arc<dyn Densifier> {
        let max_tokens = self.config.max_output_tokens;
        match provider {
            Provider::OpenAi => Arc::new(OpenAiDensifier::new(
                self.client.clone(),
                self.config.openai_base_url.clone(),
                max_tokens,
            )),
            Provider::Anthropic => Arc::new(AnthropicDensifier::new(
                self.client.clone(),
                self.config.anthropic_base_url.clone(),
                max_tokens,
            )),
            Provider::Ollama => Arc::new(OllamaDensifier::new(
                self.client.clone(),
                self.config.ollama_base_url.clone(),
                max_tokens,
            )),
            Provider::ClaudeCli => Arc::new(ClaudeCliDensifier::new(
                self.config.claude_binary.clone(),
                self.config.request_timeout(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_gets_its_own_densifier() {
        let factory = ProviderDensifierFactory::new(DensifyConfig::default()).unwrap();
        for provider in Provider::ALL {
            assert_eq!(factory.densifier(provider).provider(), provider);
        }
    }
}
