//! Capture → densify → journal, and the retry path for failed snapshots.

mod capture;
mod retry;

use std::sync::Arc;

use crate::densify::{Densifier, DensifierFactory, Provider};
use crate::error::{WorkflowError, WorkflowResult};
use crate::secrets::SecretStore;

pub use capture::{CaptureResult, CaptureWorkflow};
pub use retry::RetryWorkflow;

/// Provider, model and credential for one densification run.
struct DensifierSetup {
    provider: Provider,
    model: String,
    credential: Option<String>,
    densifier: Arc<dyn Densifier>,
}

/// Shared by both workflows: what to densify with.
#[derive(Clone)]
struct DensifierResolver {
    secrets: Arc<dyn SecretStore>,
    factory: Arc<dyn DensifierFactory>,
}

impl DensifierResolver {
    fn resolve(&self, provider: Provider, model: Option<&str>) -> WorkflowResult<DensifierSetup> {
        let credential = self.credential_for(provider)?;
        Ok(DensifierSetup {
            provider,
            model: provider.resolve_model(model),
            credential,
            densifier: self.factory.densifier(provider),
        })
    }

    fn credential_for(&self, provider: Provider) -> WorkflowResult<Option<String>> {
        let stored = self
            .secrets
            .get(&provider.credential_key())?
            .filter(|value| !value.trim().is_empty());

        if provider.requires_credential() && stored.is_none() {
            return Err(WorkflowError::KeyNotConfigured {
                provider: provider.display_name().to_string(),
            });
        }
        Ok(stored)
    }
}
