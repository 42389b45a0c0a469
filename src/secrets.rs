//! API key storage.
//!
//! The host app normally backs [`SecretStore`] with the platform keychain.
//! The file store keeps keys in a `0600` JSON file for headless setups and
//! development; the memory store is for tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};

use crate::utils::fs::write_atomic;

pub trait SecretStore: Send + Sync {
    fn set(&self, value: &str, key: &str) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns whether a value was removed.
    fn delete(&self, key: &str) -> Result<bool>;
}

fn lock_poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("secret store lock poisoned")
}

#[derive(Default)]
pub struct MemorySecretStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn set(&self, value: &str, key: &str) -> Result<()> {
        self.values
            .write()
            .map_err(lock_poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().map_err(lock_poisoned)?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self
            .values
            .write()
            .map_err(lock_poisoned)?
            .remove(key)
            .is_some())
    }
}

pub struct FileSecretStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileSecretStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read secrets from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Secrets file {} is not valid JSON", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(values)?;
        write_atomic(&self.path, serialized.as_bytes(), true)
            .with_context(|| format!("Failed to write secrets to {}", self.path.display()))
    }
}

impl SecretStore for FileSecretStore {
    fn set(&self, value: &str, key: &str) -> Result<()> {
        let mut guard = self.values.write().map_err(lock_poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().map_err(lock_poisoned)?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self.values.write().map_err(lock_poisoned)?;
        let removed = guard.remove(key).is_some();
        if removed {
            self.persist(&guard)?;
        }
        Ok(removed)
    }
}
