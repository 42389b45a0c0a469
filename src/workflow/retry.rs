use std::sync::Arc;

use chrono::Utc;

use crate::config::RetryPolicy;
use crate::densify::{densify_with_retry, DensifierFactory, DensifyOutcome, DensifyRequest, Provider};
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{Snapshot, SnapshotStatus};
use crate::secrets::SecretStore;
use crate::session::SessionManager;

use super::DensifierResolver;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Re-runs densification for a failed snapshot from its stored text.
#[derive(Clone)]
pub struct RetryWorkflow {
    session: SessionManager,
    resolver: DensifierResolver,
    retry: RetryPolicy,
}

impl RetryWorkflow {
    pub fn new(
        session: SessionManager,
        secrets: Arc<dyn SecretStore>,
        factory: Arc<dyn DensifierFactory>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            session,
            resolver: DensifierResolver { secrets, factory },
            retry,
        }
    }

    /// Snapshots that are not `failed` come back unchanged. A failed retry is
    /// persisted on the snapshot and also returned as the error.
    pub async fn retry_failed_snapshot(&self, snapshot_id: &str) -> WorkflowResult<Snapshot> {
        let snapshot = self.session.snapshot(snapshot_id).await?;
        if !snapshot.is_failed() {
            return Ok(snapshot);
        }

        let (provider, model) = self.provider_for(&snapshot).await?;
        let setup = self.resolver.resolve(provider, model.as_deref())?;

        let request = DensifyRequest {
            text: snapshot.densify_input().to_string(),
            app_name: snapshot.app_name.clone(),
            window_title: snapshot.window_title.clone(),
            provider: setup.provider,
            model: setup.model.clone(),
            credential: setup.credential.clone(),
        };
        let outcome = densify_with_retry(setup.densifier.as_ref(), &request, &self.retry).await;

        let provider_name = setup.provider.as_str().to_string();
        let model = setup.model.clone();
        let attempted_at = Utc::now();

        match outcome {
            DensifyOutcome::Success { output, .. } => {
                let updated = self
                    .session
                    .update_snapshot(snapshot_id, move |snapshot| {
                        snapshot.status = SnapshotStatus::Ready;
                        snapshot.dense_content = output.content;
                        snapshot.failure_message = None;
                        snapshot.retry_count += 1;
                        snapshot.last_attempt_at = Some(attempted_at);
                        snapshot.provider = Some(provider_name);
                        snapshot.model = Some(model);
                    })
                    .await?;
                log_info!("Retry densified snapshot {}", updated.id);
                Ok(updated)
            }
            DensifyOutcome::Failure { error, .. } => {
                let message = error.to_string();
                self.session
                    .update_snapshot(snapshot_id, move |snapshot| {
                        snapshot.failure_message = Some(message);
                        snapshot.retry_count += 1;
                        snapshot.last_attempt_at = Some(attempted_at);
                        snapshot.provider = Some(provider_name);
                        snapshot.model = Some(model);
                    })
                    .await?;
                log_warn!("Retry of snapshot {} failed: {}", snapshot_id, error);
                Err(WorkflowError::Densify(error))
            }
        }
    }

    /// The provider recorded on the snapshot, or the current selection for
    /// snapshots that never recorded one.
    async fn provider_for(&self, snapshot: &Snapshot) -> WorkflowResult<(Provider, Option<String>)> {
        if let Some(recorded) = snapshot.provider.as_deref() {
            let provider = recorded
                .parse::<Provider>()
                .map_err(|_| WorkflowError::ProviderNotConfigured)?;
            return Ok((provider, snapshot.model.clone()));
        }

        let app_state = self.session.app_state().await?;
        let provider = app_state
            .selected_provider
            .ok_or(WorkflowError::ProviderNotConfigured)?;
        Ok((provider, app_state.selected_model))
    }
}
