use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Where densification runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// OpenAI chat completions API
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Local `claude` command-line tool, using its own login
    #[serde(rename = "claude_cli")]
    ClaudeCli,
    /// Local Ollama server
    #[serde(rename = "ollama")]
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::ClaudeCli,
        Provider::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::ClaudeCli => "claude_cli",
            Provider::Ollama => "ollama",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::ClaudeCli => "Claude CLI",
            Provider::Ollama => "Ollama",
        }
    }

    pub fn requires_credential(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::Anthropic)
    }

    /// Secret store key holding this provider's API key.
    pub fn credential_key(&self) -> String {
        format!("{}_api_key", self.as_str())
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-haiku-latest",
            Provider::ClaudeCli => "haiku",
            Provider::Ollama => "llama3.2",
        }
    }

    pub fn suggested_models(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini"],
            Provider::Anthropic => &[
                "claude-3-5-haiku-latest",
                "claude-sonnet-4-0",
                "claude-3-7-sonnet-latest",
            ],
            Provider::ClaudeCli => &["haiku", "sonnet", "opus"],
            Provider::Ollama => &["llama3.2", "qwen2.5", "mistral"],
        }
    }

    /// Input token ceiling checked before any request is sent.
    pub fn max_input_tokens(&self) -> usize {
        match self {
            Provider::OpenAi => 120_000,
            Provider::Anthropic | Provider::ClaudeCli => 180_000,
            Provider::Ollama => 8_000,
        }
    }

    /// `model` when it names something, the provider default otherwise.
    pub fn resolve_model(&self, model: Option<&str>) -> String {
        model
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(self.default_model())
            .to_string()
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "claude_cli" | "claude-cli" | "claude" => Ok(Provider::ClaudeCli),
            "ollama" => Ok(Provider::Ollama),
            _ => bail!("Unknown densification provider: {}", s),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
