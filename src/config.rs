//! Engine configuration.
//!
//! One `EngineConfig` value is built at startup and handed to each component.
//! It is read from `config.json` in the data directory; a missing or unreadable
//! file yields defaults so a bad edit never blocks capture.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::fs::write_atomic;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const JOURNAL_FILE_NAME: &str = "journal.json";
pub const SECRETS_FILE_NAME: &str = "secrets.json";
pub const SCREENSHOTS_DIR_NAME: &str = "screenshots";

const APP_DIR_NAME: &str = "ContextJournal";

/// Limits on a single accessibility traversal. Whichever runs out first ends
/// the walk with a partial result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureBudgets {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub max_lines: usize,
    pub deadline_ms: u64,
}

impl Default for CaptureBudgets {
    fn default() -> Self {
        Self {
            max_depth: 48,
            max_nodes: 4_000,
            max_lines: 1_500,
            deadline_ms: 2_500,
        }
    }
}

impl CaptureBudgets {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    pub budgets: CaptureBudgets,
    /// Longest screenshot edge in pixels kept for OCR and on disk.
    pub max_screenshot_edge: u32,
    /// Bundle identifier of the host app; captures of it are refused.
    pub own_bundle_identifier: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            budgets: CaptureBudgets::default(),
            max_screenshot_edge: 2_400,
            own_bundle_identifier: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay_ms: 1_500,
        }
    }
}

impl RetryPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DensifyConfig {
    pub retry: RetryPolicy,
    pub request_timeout_secs: u64,
    pub max_output_tokens: u32,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub ollama_base_url: String,
    /// Executable used by the Claude CLI provider.
    pub claude_binary: String,
}

impl Default for DensifyConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout_secs: 90,
            max_output_tokens: 2_048,
            openai_base_url: "https://api.openai.com/v1".into(),
            anthropic_base_url: "https://api.anthropic.com/v1".into(),
            ollama_base_url: "http://127.0.0.1:11434".into(),
            claude_binary: "claude".into(),
        }
    }
}

impl DensifyConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub capture: CaptureConfig,
    pub densify: DensifyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            capture: CaptureConfig::default(),
            densify: DensifyConfig::default(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

impl EngineConfig {
    /// Loads `config.json` from `data_dir`. The directory always wins over
    /// whatever `dataDir` the file mentions.
    pub fn load(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable config at {}: {err}", path.display());
                EngineConfig::default()
            })
        } else {
            EngineConfig::default()
        };

        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn persist(&self) -> Result<()> {
        let path = self.data_dir.join(CONFIG_FILE_NAME);
        let serialized = serde_json::to_string_pretty(self)?;
        write_atomic(&path, serialized.as_bytes(), false)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE_NAME)
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.data_dir.join(SECRETS_FILE_NAME)
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.data_dir.join(SCREENSHOTS_DIR_NAME)
    }
}
