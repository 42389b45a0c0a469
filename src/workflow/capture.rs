use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;

use crate::capture::{CaptureDiagnostics, CaptureEngine, CapturedSnapshot};
use crate::config::RetryPolicy;
use crate::densify::{densify_with_retry, DensifierFactory, DensifyOutcome, DensifyRequest};
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{NewSnapshot, Snapshot, SnapshotStatus, SOURCE_FRONTMOST_WINDOW};
use crate::secrets::SecretStore;
use crate::session::SessionManager;
use crate::store::ArtifactStore;

use super::{DensifierResolver, DensifierSetup};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub snapshot: Snapshot,
    pub diagnostics: CaptureDiagnostics,
    /// Where the screenshot was written, if one was taken and saved.
    pub screenshot_path: Option<PathBuf>,
}

/// One capture shortcut press: capture the frontmost window, densify it,
/// and append the result to the current context.
#[derive(Clone)]
pub struct CaptureWorkflow {
    engine: CaptureEngine,
    session: SessionManager,
    artifacts: Option<ArtifactStore>,
    resolver: DensifierResolver,
    retry: RetryPolicy,
}

impl CaptureWorkflow {
    pub fn new(
        engine: CaptureEngine,
        session: SessionManager,
        secrets: Arc<dyn SecretStore>,
        factory: Arc<dyn DensifierFactory>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            session,
            artifacts: None,
            resolver: DensifierResolver { secrets, factory },
            retry,
        }
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Densification failures do not fail the call: the snapshot is kept
    /// with status `failed` so it can be retried later.
    pub async fn run_capture(&self) -> WorkflowResult<CaptureResult> {
        let (captured, screenshot) = self.engine.capture().await?;

        let app_state = self.session.app_state().await?;
        let provider = app_state
            .selected_provider
            .ok_or(WorkflowError::ProviderNotConfigured)?;
        let setup = self
            .resolver
            .resolve(provider, app_state.selected_model.as_deref())?;

        let request = DensifyRequest {
            text: captured
                .filtered_combined_text
                .clone()
                .unwrap_or_else(|| captured.combined_text.clone()),
            app_name: captured.app_name.clone(),
            window_title: captured.window_title.clone(),
            provider: setup.provider,
            model: setup.model.clone(),
            credential: setup.credential.clone(),
        };
        let outcome = densify_with_retry(setup.densifier.as_ref(), &request, &self.retry).await;

        let diagnostics = captured.diagnostics.clone();
        let snapshot = self
            .session
            .append_snapshot(draft_snapshot(captured, &setup, outcome))
            .await?;

        if snapshot.is_failed() {
            log_warn!(
                "Densification failed for snapshot {}: {}",
                snapshot.id,
                snapshot.failure_message.as_deref().unwrap_or("unknown error")
            );
        }

        let screenshot_path = match screenshot {
            Some(image) => self.save_screenshot(&snapshot.id, image).await,
            None => None,
        };

        Ok(CaptureResult {
            snapshot,
            diagnostics,
            screenshot_path,
        })
    }

    /// Artifact failures are logged; the snapshot is already durable.
    async fn save_screenshot(&self, snapshot_id: &str, image: DynamicImage) -> Option<PathBuf> {
        let artifacts = self.artifacts.clone()?;
        let id = snapshot_id.to_string();

        let result =
            tokio::task::spawn_blocking(move || artifacts.save_screenshot(&id, &image)).await;
        match result {
            Ok(Ok(path)) => Some(path),
            Ok(Err(err)) => {
                log_warn!("Failed to save screenshot for {snapshot_id}: {err:#}");
                None
            }
            Err(err) => {
                log_error!("Screenshot writer for {snapshot_id} did not finish: {err}");
                None
            }
        }
    }
}

fn draft_snapshot(captured: CapturedSnapshot, setup: &DensifierSetup, outcome: DensifyOutcome) -> NewSnapshot {
    let fallback_title = captured.fallback_title();
    let retry_count = outcome.retries();

    let (title, dense_content, status, failure_message) = match outcome {
        DensifyOutcome::Success { output, retries } => {
            log_info!(
                "Densified {} via {} ({} retries)",
                captured.app_name,
                setup.provider,
                retries
            );
            (
                output.title.unwrap_or(fallback_title),
                output.content,
                SnapshotStatus::Ready,
                None,
            )
        }
        DensifyOutcome::Failure { error, .. } => (
            fallback_title,
            String::new(),
            SnapshotStatus::Failed,
            Some(error.to_string()),
        ),
    };

    NewSnapshot {
        title,
        source_type: SOURCE_FRONTMOST_WINDOW.to_string(),
        app_name: captured.app_name,
        bundle_identifier: captured.bundle_identifier,
        window_title: captured.window_title,
        capture_method: captured.capture_method,
        raw_content: captured.combined_text,
        filtered_combined_text: captured.filtered_combined_text,
        ocr_content: captured.ocr_text,
        dense_content,
        provider: Some(setup.provider.as_str().to_string()),
        model: Some(setup.model.clone()),
        accessibility_line_count: captured.diagnostics.accessibility_line_count,
        ocr_line_count: captured.diagnostics.ocr_line_count,
        processing_duration_ms: captured.diagnostics.processing_duration_ms,
        status,
        failure_message,
        retry_count,
        last_attempt_at: Some(Utc::now()),
    }
}
