//! Context data model.
//!
//! A context is one named journal; snapshots are appended to it in sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of live snapshots filed under this context. Maintained on every
    /// mutation that touches the snapshot collection.
    pub snapshot_count: u32,
}

impl Context {
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            created_at: now,
            updated_at: now,
            snapshot_count: 0,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Title given to contexts created without an explicit one.
pub fn default_context_title(existing_contexts: usize) -> String {
    format!("Context {}", existing_contexts + 1)
}
