use crate::config::RetryPolicy;

use super::error::DensifyError;
use super::{Densifier, DensifyOutput, DensifyRequest};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Result of a bounded run of attempts. `retries` counts attempts after the
/// first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DensifyOutcome {
    Success { output: DensifyOutput, retries: u32 },
    Failure { error: DensifyError, retries: u32 },
}

impl DensifyOutcome {
    pub fn retries(&self) -> u32 {
        match self {
            DensifyOutcome::Success { retries, .. } | DensifyOutcome::Failure { retries, .. } => *retries,
        }
    }
}

/// Calls `densifier` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is reached. Attempts run one at a time with a fixed
/// delay between them.
pub async fn densify_with_retry(
    densifier: &dyn Densifier,
    request: &DensifyRequest,
    policy: &RetryPolicy,
) -> DensifyOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match densifier.densify(request).await {
            Ok(output) => {
                return DensifyOutcome::Success {
                    output,
                    retries: attempt - 1,
                }
            }
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                log_warn!(
                    "Densify attempt {}/{} via {} failed, retrying in {}ms: {}",
                    attempt,
                    max_attempts,
                    densifier.provider(),
                    policy.retry_delay_ms,
                    error
                );
                tokio::time::sleep(policy.retry_delay()).await;
                attempt += 1;
            }
            Err(error) => {
                return DensifyOutcome::Failure {
                    error,
                    retries: attempt - 1,
                }
            }
        }
    }
}
