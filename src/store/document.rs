//! The single persisted journal document.

use serde::{Deserialize, Serialize};

use crate::models::{AppState, Context, Snapshot, TrashedContext, TrashedSnapshot};

use super::migrations::CURRENT_SCHEMA_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JournalDocument {
    pub schema_version: u32,
    #[serde(default)]
    pub app_state: AppState,
    #[serde(default)]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub trashed_snapshots: Vec<TrashedSnapshot>,
    #[serde(default)]
    pub trashed_contexts: Vec<TrashedContext>,
}

impl Default for JournalDocument {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            app_state: AppState::default(),
            contexts: Vec::new(),
            snapshots: Vec::new(),
            trashed_snapshots: Vec::new(),
            trashed_contexts: Vec::new(),
        }
    }
}

impl JournalDocument {
    pub fn context(&self, id: &str) -> Option<&Context> {
        self.contexts.iter().find(|context| context.id == id)
    }

    pub fn context_mut(&mut self, id: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|context| context.id == id)
    }

    pub fn snapshot(&self, id: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    pub fn snapshot_mut(&mut self, id: &str) -> Option<&mut Snapshot> {
        self.snapshots.iter_mut().find(|snapshot| snapshot.id == id)
    }

    /// Current context, ignoring a reference to a context that no longer exists.
    pub fn current_context(&self) -> Option<&Context> {
        self.app_state
            .current_context_id
            .as_deref()
            .and_then(|id| self.context(id))
    }

    /// Contexts sorted by `updatedAt`, most recent first.
    pub fn contexts_by_recency(&self) -> Vec<Context> {
        let mut contexts = self.contexts.clone();
        contexts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        contexts
    }

    /// Live snapshots of a context in ascending sequence order.
    pub fn snapshots_in(&self, context_id: &str) -> Vec<&Snapshot> {
        let mut snapshots: Vec<&Snapshot> = self
            .snapshots
            .iter()
            .filter(|snapshot| snapshot.context_id == context_id)
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.sequence);
        snapshots
    }

    /// Highest live sequence in a context, 0 when it is empty.
    pub fn last_sequence(&self, context_id: &str) -> u32 {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.context_id == context_id)
            .map(|snapshot| snapshot.sequence)
            .max()
            .unwrap_or(0)
    }

    /// Id of the highest-sequence live snapshot in a context.
    pub fn last_snapshot_id(&self, context_id: &str) -> Option<String> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.context_id == context_id)
            .max_by_key(|snapshot| snapshot.sequence)
            .map(|snapshot| snapshot.id.clone())
    }

    pub fn live_count(&self, context_id: &str) -> u32 {
        let count = self
            .snapshots
            .iter()
            .filter(|snapshot| snapshot.context_id == context_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Removes a live snapshot by id and returns it.
    pub fn take_snapshot(&mut self, id: &str) -> Option<Snapshot> {
        let index = self.snapshots.iter().position(|snapshot| snapshot.id == id)?;
        Some(self.snapshots.remove(index))
    }
}
