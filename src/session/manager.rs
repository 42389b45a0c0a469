use chrono::Utc;

use crate::densify::Provider;
use crate::error::{SessionError, SessionResult};
use crate::models::{
    AppState, Context, NewSnapshot, ShortcutAction, Snapshot, TrashedContext, TrashedSnapshot,
};
use crate::store::{ArtifactStore, Store};

use super::journal;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Journal operations over the shared [`Store`].
///
/// Each call is a single store transaction: the document is re-read, changed
/// through [`journal`], and written back before the next call runs.
#[derive(Clone)]
pub struct SessionManager {
    store: Store,
    artifacts: Option<ArtifactStore>,
}

impl SessionManager {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            artifacts: None,
        }
    }

    /// Purges also remove screenshot artifacts from `artifacts`.
    pub fn with_artifacts(store: Store, artifacts: ArtifactStore) -> Self {
        Self {
            store,
            artifacts: Some(artifacts),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn create_new_context(&self, title: Option<String>) -> SessionResult<Context> {
        let context = self
            .store
            .mutate(move |doc| Ok::<_, SessionError>(journal::create_context(doc, title.as_deref(), Utc::now())))
            .await?;
        log_info!("Created context {} ({})", context.id, context.title);
        Ok(context)
    }

    /// The current context, created on demand when none is selected or the
    /// selection points at a context that no longer exists.
    pub async fn current_context(&self) -> SessionResult<Context> {
        // Reads are cheap; only take the write path when a context must be created.
        let document = self.store.load().await?;
        if let Some(context) = document.current_context() {
            return Ok(context.clone());
        }

        self.store
            .mutate(|doc| {
                let id = journal::ensure_current_context(doc, Utc::now());
                doc.context(&id)
                    .cloned()
                    .ok_or(SessionError::ContextNotFound(id))
            })
            .await
    }

    pub async fn select_context(&self, context_id: &str) -> SessionResult<Context> {
        let context_id = context_id.to_string();
        self.store
            .mutate(move |doc| journal::select_context(doc, &context_id))
            .await
    }

    pub async fn append_snapshot(&self, draft: NewSnapshot) -> SessionResult<Snapshot> {
        let snapshot = self
            .store
            .mutate(move |doc| journal::append_snapshot(doc, draft, Utc::now()))
            .await?;
        log_info!(
            "Appended snapshot {} as #{} in context {}",
            snapshot.id,
            snapshot.sequence,
            snapshot.context_id
        );
        Ok(snapshot)
    }

    pub async fn undo_last_capture_in_current_context(&self) -> SessionResult<TrashedSnapshot> {
        let trashed = self
            .store
            .mutate(|doc| journal::undo_last_capture(doc, Utc::now()))
            .await?;
        log_info!("Undid capture {} from {}", trashed.id(), trashed.context_title);
        Ok(trashed)
    }

    pub async fn promote_last_capture_to_new_context(
        &self,
        title: Option<String>,
    ) -> SessionResult<(Context, Snapshot)> {
        self.store
            .mutate(move |doc| journal::promote_last_capture(doc, title.as_deref(), Utc::now()))
            .await
    }

    pub async fn move_snapshot_to_current_context(&self, snapshot_id: &str) -> SessionResult<Snapshot> {
        let snapshot_id = snapshot_id.to_string();
        self.store
            .mutate(move |doc| journal::move_to_current_context(doc, &snapshot_id, Utc::now()))
            .await
    }

    pub async fn move_snapshot_to_new_context(
        &self,
        snapshot_id: &str,
        title: Option<String>,
    ) -> SessionResult<(Context, Snapshot)> {
        let snapshot_id = snapshot_id.to_string();
        self.store
            .mutate(move |doc| {
                journal::move_to_new_context(doc, &snapshot_id, title.as_deref(), Utc::now())
            })
            .await
    }

    pub async fn delete_context_to_trash(&self, context_id: &str) -> SessionResult<TrashedContext> {
        let context_id = context_id.to_string();
        let trashed = self
            .store
            .mutate(move |doc| journal::trash_context(doc, &context_id, Utc::now()))
            .await?;
        log_info!(
            "Moved context {} to trash with {} snapshots",
            trashed.id(),
            trashed.snapshots.len()
        );
        Ok(trashed)
    }

    pub async fn delete_snapshot_to_trash(&self, snapshot_id: &str) -> SessionResult<TrashedSnapshot> {
        let snapshot_id = snapshot_id.to_string();
        self.store
            .mutate(move |doc| journal::trash_snapshot(doc, &snapshot_id, Utc::now()))
            .await
    }

    pub async fn restore_trashed_snapshot(
        &self,
        trashed_id: &str,
        to_context: Option<String>,
    ) -> SessionResult<Snapshot> {
        let trashed_id = trashed_id.to_string();
        self.store
            .mutate(move |doc| {
                journal::restore_snapshot(doc, &trashed_id, to_context.as_deref(), Utc::now())
            })
            .await
    }

    pub async fn restore_trashed_context(&self, trashed_id: &str) -> SessionResult<Context> {
        let trashed_id = trashed_id.to_string();
        let context = self
            .store
            .mutate(move |doc| journal::restore_context(doc, &trashed_id, Utc::now()))
            .await?;
        log_info!("Restored context {} ({})", context.id, context.title);
        Ok(context)
    }

    pub async fn rename_context(&self, context_id: &str, title: &str) -> SessionResult<Context> {
        let context_id = context_id.to_string();
        let title = title.to_string();
        self.store
            .mutate(move |doc| journal::rename_context(doc, &context_id, &title, Utc::now()))
            .await
    }

    pub async fn rename_snapshot(&self, snapshot_id: &str, title: &str) -> SessionResult<Snapshot> {
        let snapshot_id = snapshot_id.to_string();
        let title = title.to_string();
        self.store
            .mutate(move |doc| journal::rename_snapshot(doc, &snapshot_id, &title))
            .await
    }

    /// Applies `update` to a live snapshot in place.
    pub async fn update_snapshot<F>(&self, snapshot_id: &str, update: F) -> SessionResult<Snapshot>
    where
        F: FnOnce(&mut Snapshot) + Send + 'static,
    {
        let snapshot_id = snapshot_id.to_string();
        self.store
            .mutate(move |doc| {
                let snapshot = doc
                    .snapshot_mut(&snapshot_id)
                    .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.clone()))?;
                update(snapshot);
                Ok(snapshot.clone())
            })
            .await
    }

    pub async fn purge_trashed_snapshot(&self, trashed_id: &str) -> SessionResult<()> {
        let trashed_id = trashed_id.to_string();
        let purged = self
            .store
            .mutate(move |doc| journal::purge_trashed_snapshot(doc, &trashed_id))
            .await?;
        self.remove_artifacts(&purged);
        Ok(())
    }

    pub async fn purge_trashed_context(&self, trashed_id: &str) -> SessionResult<()> {
        let trashed_id = trashed_id.to_string();
        let purged = self
            .store
            .mutate(move |doc| journal::purge_trashed_context(doc, &trashed_id))
            .await?;
        self.remove_artifacts(&purged);
        Ok(())
    }

    /// Purges both trash collections. Returns how many snapshots were dropped.
    pub async fn empty_trash(&self) -> SessionResult<usize> {
        let purged = self
            .store
            .mutate(|doc| Ok::<_, SessionError>(journal::empty_trash(doc)))
            .await?;
        self.remove_artifacts(&purged);
        log_info!("Emptied trash ({} snapshots)", purged.len());
        Ok(purged.len())
    }

    fn remove_artifacts(&self, snapshot_ids: &[String]) {
        let Some(artifacts) = &self.artifacts else {
            return;
        };
        for id in snapshot_ids {
            match artifacts.delete(id) {
                Ok(true) => log_debug!("Deleted screenshot for {id}"),
                Ok(false) => {}
                Err(err) => log_warn!("Failed to delete screenshot for {id}: {err:#}"),
            }
        }
    }

    pub async fn list_contexts(&self) -> SessionResult<Vec<Context>> {
        Ok(self.store.load().await?.contexts_by_recency())
    }

    pub async fn snapshots_in_context(&self, context_id: &str) -> SessionResult<Vec<Snapshot>> {
        let document = self.store.load().await?;
        if document.context(context_id).is_none() {
            return Err(SessionError::ContextNotFound(context_id.to_string()));
        }
        Ok(document
            .snapshots_in(context_id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn snapshot(&self, snapshot_id: &str) -> SessionResult<Snapshot> {
        self.store
            .load()
            .await?
            .snapshot(snapshot_id)
            .cloned()
            .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()))
    }

    /// Most recently deleted first.
    pub async fn list_trashed_snapshots(&self) -> SessionResult<Vec<TrashedSnapshot>> {
        let mut trashed = self.store.load().await?.trashed_snapshots;
        trashed.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(trashed)
    }

    /// Most recently deleted first.
    pub async fn list_trashed_contexts(&self) -> SessionResult<Vec<TrashedContext>> {
        let mut trashed = self.store.load().await?.trashed_contexts;
        trashed.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(trashed)
    }

    pub async fn context_transcript(&self, context_id: &str) -> SessionResult<String> {
        let document = self.store.load().await?;
        journal::context_transcript(&document, context_id)
    }

    pub async fn app_state(&self) -> SessionResult<AppState> {
        Ok(self.store.load().await?.app_state)
    }

    pub async fn set_densifier_selection(
        &self,
        provider: Provider,
        model: Option<String>,
    ) -> SessionResult<AppState> {
        let model = model
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty());
        self.update_app_state(move |state| {
            state.selected_provider = Some(provider);
            state.selected_model = model;
        })
        .await
    }

    pub async fn complete_onboarding(&self) -> SessionResult<AppState> {
        self.update_app_state(|state| state.has_completed_onboarding = true)
            .await
    }

    /// Marks that the app has launched; returns whether this was the first launch.
    pub async fn record_launch(&self) -> SessionResult<bool> {
        self.store
            .mutate(|doc| {
                let first_launch = !doc.app_state.has_launched_before;
                doc.app_state.has_launched_before = true;
                Ok::<_, SessionError>(first_launch)
            })
            .await
    }

    pub async fn set_shortcut(&self, action: ShortcutAction, binding: &str) -> SessionResult<AppState> {
        let binding = binding.trim().to_string();
        if binding.is_empty() {
            return Err(SessionError::EmptyShortcut);
        }
        self.update_app_state(move |state| state.shortcuts.set(action, binding))
            .await
    }

    async fn update_app_state<F>(&self, update: F) -> SessionResult<AppState>
    where
        F: FnOnce(&mut AppState) + Send + 'static,
    {
        self.store
            .mutate(move |doc| {
                update(&mut doc.app_state);
                Ok::<_, SessionError>(doc.app_state.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaptureMethod, SnapshotStatus, SOURCE_FRONTMOST_WINDOW};
    use image::{DynamicImage, RgbaImage};
    use tempfile::TempDir;

    fn draft(content: &str) -> NewSnapshot {
        NewSnapshot {
            title: content.to_string(),
            source_type: SOURCE_FRONTMOST_WINDOW.to_string(),
            app_name: "Notes".into(),
            bundle_identifier: Some("com.apple.Notes".into()),
            window_title: "Inbox".into(),
            capture_method: CaptureMethod::Hybrid,
            raw_content: content.to_string(),
            filtered_combined_text: None,
            ocr_content: content.to_string(),
            dense_content: format!("dense {content}"),
            provider: None,
            model: None,
            accessibility_line_count: 1,
            ocr_line_count: 1,
            processing_duration_ms: 5,
            status: SnapshotStatus::Ready,
            failure_message: None,
            retry_count: 0,
            last_attempt_at: None,
        }
    }

    #[tokio::test]
    async fn journal_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.json");

        let context_id = {
            let manager = SessionManager::new(Store::open(path.clone()).unwrap());
            let context = manager
                .create_new_context(Some("Reading list".into()))
                .await
                .unwrap();
            manager.append_snapshot(draft("one")).await.unwrap();
            manager.append_snapshot(draft("two")).await.unwrap();
            context.id
        };

        let manager = SessionManager::new(Store::open(path).unwrap());
        let current = manager.current_context().await.unwrap();
        assert_eq!(current.id, context_id);
        assert_eq!(current.snapshot_count, 2);
        let sequences: Vec<u32> = manager
            .snapshots_in_context(&context_id)
            .await
            .unwrap()
            .iter()
            .map(|snapshot| snapshot.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[tokio::test]
    async fn current_context_is_created_on_demand() {
        let manager = SessionManager::new(Store::in_memory().unwrap());
        let first = manager.current_context().await.unwrap();
        let second = manager.current_context().await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.title, "Context 1");
    }

    #[tokio::test]
    async fn list_contexts_is_most_recent_first() {
        let manager = SessionManager::new(Store::in_memory().unwrap());
        let older = manager.create_new_context(Some("Older".into())).await.unwrap();
        manager.create_new_context(Some("Newer".into())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        manager.rename_context(&older.id, "Older, renamed").await.unwrap();

        let titles: Vec<String> = manager
            .list_contexts()
            .await
            .unwrap()
            .into_iter()
            .map(|context| context.title)
            .collect();
        assert_eq!(titles, vec!["Older, renamed", "Newer"]);
    }

    #[tokio::test]
    async fn purge_removes_screenshot_artifacts() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("screenshots")).unwrap();
        let manager = SessionManager::with_artifacts(Store::in_memory().unwrap(), artifacts.clone());

        let snapshot = manager.append_snapshot(draft("shot")).await.unwrap();
        let image = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        artifacts.save_screenshot(&snapshot.id, &image).unwrap();

        manager.delete_snapshot_to_trash(&snapshot.id).await.unwrap();
        assert_eq!(manager.list_trashed_snapshots().await.unwrap().len(), 1);
        manager.purge_trashed_snapshot(&snapshot.id).await.unwrap();

        assert!(artifacts.load_screenshot(&snapshot.id).unwrap().is_none());
        assert!(manager.list_trashed_snapshots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn app_state_settings_round_trip() {
        let manager = SessionManager::new(Store::in_memory().unwrap());
        assert!(manager.record_launch().await.unwrap());
        assert!(!manager.record_launch().await.unwrap());

        manager
            .set_densifier_selection(Provider::Anthropic, Some("  ".into()))
            .await
            .unwrap();
        manager
            .set_shortcut(ShortcutAction::Undo, " ctrl+alt+z ")
            .await
            .unwrap();
        let state = manager.complete_onboarding().await.unwrap();

        assert_eq!(state.selected_provider, Some(Provider::Anthropic));
        assert_eq!(state.selected_model, None);
        assert_eq!(state.shortcuts.get(ShortcutAction::Undo), "ctrl+alt+z");
        assert!(state.has_completed_onboarding);
    }

    #[tokio::test]
    async fn deleting_current_context_then_capturing_starts_a_new_one() {
        let manager = SessionManager::new(Store::in_memory().unwrap());
        let snapshot = manager.append_snapshot(draft("a")).await.unwrap();
        manager
            .delete_context_to_trash(&snapshot.context_id)
            .await
            .unwrap();

        assert!(manager.app_state().await.unwrap().current_context_id.is_none());
        let next = manager.append_snapshot(draft("b")).await.unwrap();
        assert_ne!(next.context_id, snapshot.context_id);
        assert_eq!(next.sequence, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_appends_get_distinct_sequences() {
        let manager = SessionManager::new(Store::in_memory().unwrap());
        let handles: Vec<_> = (0..32)
            .map(|index| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.append_snapshot(draft(&format!("s{index}"))).await })
            })
            .collect();

        let mut sequences = Vec::new();
        for handle in handles {
            sequences.push(handle.await.unwrap().unwrap().sequence);
        }
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=32).collect::<Vec<_>>());

        let contexts = manager.list_contexts().await.unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].snapshot_count, 32);
    }
}
