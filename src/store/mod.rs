//! Transactional journal store.
//!
//! One worker thread owns the [`DocumentBackend`]; every `load`, `mutate` and
//! `save` is shipped to it over a channel and runs to completion before the
//! next one starts. Each mutation re-reads the full document, applies the
//! transform and writes the whole document back. A transform that fails leaves
//! the persisted document untouched.

use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use tokio::sync::{broadcast, oneshot};

pub mod artifacts;
pub mod backend;
pub mod document;
pub mod migrations;

pub use artifacts::ArtifactStore;
pub use backend::{DocumentBackend, JsonFileBackend, MemoryBackend};
pub use document::JournalDocument;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Sent to subscribers after a mutation has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    DocumentChanged,
}

type StoreTask = Box<dyn FnOnce(&mut StoreWorker) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct StoreWorker {
    backend: Box<dyn DocumentBackend>,
}

impl StoreWorker {
    /// Reads the document, bootstrapping and persisting an empty one on first
    /// access.
    fn read_document(&mut self) -> Result<JournalDocument> {
        match self.backend.read()? {
            Some(document) => Ok(document),
            None => {
                let document = JournalDocument::default();
                self.backend
                    .write(&document)
                    .context("failed to bootstrap empty journal")?;
                info!("Bootstrapped empty journal at {}", self.backend.describe());
                Ok(document)
            }
        }
    }
}

struct StoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens the JSON journal at `path`.
    pub fn open(path: PathBuf) -> Result<Self> {
        let backend = JsonFileBackend::new(path)?;
        Self::with_backend(Box::new(backend))
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Result<Self> {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn DocumentBackend>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let description = backend.describe();

        let worker = thread::Builder::new()
            .name("context-journal-store".into())
            .spawn(move || {
                let mut worker = StoreWorker { backend };
                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => task(&mut worker),
                        StoreCommand::Shutdown => break,
                    }
                }
                info!("Store thread shutting down");
            })
            .with_context(|| "failed to spawn store worker thread")?;

        info!("Journal store opened at {description}");

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
                changes,
            }),
        })
    }

    /// Change notifications for UI refresh. Missed notifications are not
    /// replayed; receivers should reload on `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }

    async fn execute<F, T, E>(&self, task: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreWorker) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |worker| {
            let result = task(worker);
            if reply_tx.send(result).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| E::from(anyhow!("failed to send command to store thread: {err}")))?;

        reply_rx
            .await
            .map_err(|_| E::from(anyhow!("store thread terminated unexpectedly")))?
    }

    pub async fn load(&self) -> Result<JournalDocument> {
        self.execute(|worker| worker.read_document()).await
    }

    /// Runs `transform` against a freshly read document and writes the result
    /// back atomically when it returns `Ok`.
    pub async fn mutate<F, T, E>(&self, transform: F) -> Result<T, E>
    where
        F: FnOnce(&mut JournalDocument) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
    {
        let changes = self.inner.changes.clone();
        let result = self
            .execute(move |worker| -> Result<T, E> {
                let mut document = worker.read_document().map_err(E::from)?;
                let value = transform(&mut document)?;
                worker
                    .backend
                    .write(&document)
                    .context("failed to persist journal")
                    .map_err(E::from)?;
                Ok(value)
            })
            .await?;

        // Fire-and-forget: no subscribers is not an error.
        let _ = changes.send(StoreChange::DocumentChanged);
        Ok(result)
    }

    /// Replaces the whole document.
    pub async fn save(&self, document: JournalDocument) -> Result<()> {
        self.mutate(move |current| {
            *current = document;
            Ok::<(), anyhow::Error>(())
        })
        .await
    }
}
