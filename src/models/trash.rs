//! Soft-deleted snapshots and contexts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Context, Snapshot};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedSnapshot {
    /// The snapshot as it was when trashed; its `contextId` is not updated
    /// afterwards.
    pub snapshot: Snapshot,
    pub deleted_at: DateTime<Utc>,
    /// Display-only title of the context the snapshot came from.
    pub context_title: String,
}

impl TrashedSnapshot {
    pub fn id(&self) -> &str {
        &self.snapshot.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedContext {
    pub context: Context,
    /// Live snapshots of the context at deletion time, ascending by sequence.
    pub snapshots: Vec<Snapshot>,
    pub deleted_at: DateTime<Utc>,
}

impl TrashedContext {
    pub fn id(&self) -> &str {
        &self.context.id
    }
}
