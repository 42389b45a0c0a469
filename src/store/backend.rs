//! Where the journal document physically lives.
//!
//! The store worker only talks to a [`DocumentBackend`]; the JSON file backend
//! is the production one, the memory backend serves tests and previews.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::document::JournalDocument;
use super::migrations::run_migrations;
use crate::utils::fs::write_atomic;

pub trait DocumentBackend: Send + 'static {
    /// Reads the persisted document, `None` when nothing was written yet.
    fn read(&mut self) -> Result<Option<JournalDocument>>;

    /// Replaces the persisted document as a whole.
    fn write(&mut self, document: &JournalDocument) -> Result<()>;

    fn describe(&self) -> String;
}

pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create journal directory {}", parent.display())
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentBackend for JsonFileBackend {
    fn read(&mut self) -> Result<Option<JournalDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read journal from {}", self.path.display()))?;
        let mut raw: Value = serde_json::from_str(&contents)
            .with_context(|| format!("journal at {} is not valid JSON", self.path.display()))?;

        let migrated = run_migrations(&mut raw)?;
        let document: JournalDocument =
            serde_json::from_value(raw).context("failed to decode journal document")?;

        if migrated {
            self.write(&document)
                .context("failed to persist migrated journal")?;
        }

        Ok(Some(document))
    }

    fn write(&mut self, document: &JournalDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document).context("failed to encode journal")?;
        write_atomic(&self.path, json.as_bytes(), true)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    document: Option<JournalDocument>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    fn read(&mut self) -> Result<Option<JournalDocument>> {
        Ok(self.document.clone())
    }

    fn write(&mut self, document: &JournalDocument) -> Result<()> {
        self.document = Some(document.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory journal".into()
    }
}
