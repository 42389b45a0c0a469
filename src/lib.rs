pub mod capture;
pub mod config;
pub mod densify;
pub mod error;
pub mod models;
pub mod secrets;
pub mod session;
pub mod store;
pub mod utils;
pub mod workflow;

use std::sync::Arc;

use anyhow::{Context, Result};

use capture::{AccessibilityTree, CaptureEngine, OcrEngine, ScreenCapture};
use config::EngineConfig;
use densify::{DensifierFactory, ProviderDensifierFactory};
use secrets::{FileSecretStore, SecretStore};
use session::SessionManager;
use store::{ArtifactStore, Store};
use workflow::{CaptureWorkflow, RetryWorkflow};

pub use error::{CaptureError, SessionError, WorkflowError};
pub use utils::logging::init_logging;

/// OS services the host app provides.
#[derive(Clone)]
pub struct PlatformServices {
    pub accessibility: Arc<dyn AccessibilityTree>,
    pub screen: Arc<dyn ScreenCapture>,
    pub ocr: Arc<dyn OcrEngine>,
}

/// Every component wired together over one data directory.
#[derive(Clone)]
pub struct ContextJournal {
    config: EngineConfig,
    store: Store,
    session: SessionManager,
    artifacts: ArtifactStore,
    secrets: Arc<dyn SecretStore>,
    capture: CaptureWorkflow,
    retry: RetryWorkflow,
}

impl ContextJournal {
    /// Opens the journal with keys in `secrets.json` and the real providers.
    pub fn open(config: EngineConfig, platform: PlatformServices) -> Result<Self> {
        let secrets = Arc::new(FileSecretStore::open(config.secrets_path())?);
        let factory = Arc::new(ProviderDensifierFactory::new(config.densify.clone())?);
        Self::assemble(config, platform, secrets, factory)
    }

    pub fn assemble(
        config: EngineConfig,
        platform: PlatformServices,
        secrets: Arc<dyn SecretStore>,
        factory: Arc<dyn DensifierFactory>,
    ) -> Result<Self> {
        let store = Store::open(config.journal_path())
            .with_context(|| format!("failed to open journal in {}", config.data_dir.display()))?;
        let artifacts = ArtifactStore::new(config.screenshots_dir())?;
        let session = SessionManager::with_artifacts(store.clone(), artifacts.clone());

        let engine = CaptureEngine::new(
            platform.accessibility,
            platform.screen,
            platform.ocr,
            config.capture.clone(),
        );
        let capture = CaptureWorkflow::new(
            engine,
            session.clone(),
            secrets.clone(),
            factory.clone(),
            config.densify.retry.clone(),
        )
        .with_artifacts(artifacts.clone());
        let retry = RetryWorkflow::new(
            session.clone(),
            secrets.clone(),
            factory,
            config.densify.retry.clone(),
        );

        log::info!("Context journal opened at {}", config.data_dir.display());

        Ok(Self {
            config,
            store,
            session,
            artifacts,
            secrets,
            capture,
            retry,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn secrets(&self) -> &Arc<dyn SecretStore> {
        &self.secrets
    }

    pub fn capture(&self) -> &CaptureWorkflow {
        &self.capture
    }

    pub fn retry(&self) -> &RetryWorkflow {
        &self.retry
    }
}
