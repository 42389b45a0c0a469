//! Densification through the local `claude` command-line tool.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::DensifyError;
use super::prompt::{checked_user_prompt, parse_output, SYSTEM_PROMPT};
use super::{Densifier, DensifyOutput, DensifyRequest, Provider};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub struct ClaudeCliDensifier {
    binary: String,
    timeout: Duration,
}

impl ClaudeCliDensifier {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn run(&self, model: &str, input: String) -> Result<String, DensifyError> {
        let mut child = Command::new(&self.binary)
            .args(["--print", "--output-format", "text", "--model", model])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => DensifyError::ToolNotFound(format!(
                    "`{}` is not installed or not on PATH",
                    self.binary
                )),
                _ => DensifyError::Transient(format!("Failed to start `{}`: {err}", self.binary)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|err| DensifyError::Transient(format!("Failed to write prompt: {err}")))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                DensifyError::Timeout(format!(
                    "`{}` did not finish within {}s",
                    self.binary,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| DensifyError::Transient(format!("`{}` failed: {err}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(&stderr, model));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Reads the tool's stderr for a failure class; unknown failures are retried.
fn classify_failure(stderr: &str, model: &str) -> DensifyError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("login") || lowered.contains("auth") || lowered.contains("api key") {
        DensifyError::AuthenticationFailed(stderr.to_string())
    } else if lowered.contains("model") && (lowered.contains("not found") || lowered.contains("invalid")) {
        DensifyError::ModelUnavailable {
            model: model.to_string(),
            message: stderr.to_string(),
            suggestions: Provider::ClaudeCli
                .suggested_models()
                .iter()
                .map(|suggestion| suggestion.to_string())
                .collect(),
        }
    } else {
        DensifyError::Transient(format!("claude exited with an error: {stderr}"))
    }
}

#[async_trait]
impl Densifier for ClaudeCliDensifier {
    async fn densify(&self, request: &DensifyRequest) -> Result<DensifyOutput, DensifyError> {
        let prompt = checked_user_prompt(request)?;
        log_debug!("Running {} with model {}", self.binary, request.model);
        let stdout = self
            .run(&request.model, format!("{SYSTEM_PROMPT}\n\n{prompt}"))
            .await?;
        parse_output(&stdout)
    }

    fn provider(&self) -> Provider {
        Provider::ClaudeCli
    }
}
