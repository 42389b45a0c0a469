//! Invariant-preserving journal operations on an in-memory document.
//!
//! Every function here runs inside a single store transaction, so the
//! sequence numbers and `snapshotCount` projections it maintains are read and
//! written atomically together with the snapshot collection.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::models::{
    default_context_title, Context, NewSnapshot, Snapshot, TrashedContext, TrashedSnapshot,
};
use crate::store::JournalDocument;

fn normalize_title(title: &str) -> SessionResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(SessionError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn context_title_or_default(doc: &JournalDocument, title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_context_title(doc.contexts.len()))
}

/// Creates a context and makes it current.
pub fn create_context(doc: &mut JournalDocument, title: Option<&str>, now: DateTime<Utc>) -> Context {
    let context = Context::new(context_title_or_default(doc, title), now);
    doc.app_state.current_context_id = Some(context.id.clone());
    doc.contexts.push(context.clone());
    context
}

/// Id of the current context, creating one if the reference is null or
/// dangling.
pub fn ensure_current_context(doc: &mut JournalDocument, now: DateTime<Utc>) -> String {
    if let Some(context) = doc.current_context() {
        return context.id.clone();
    }
    create_context(doc, None, now).id
}

pub fn select_context(doc: &mut JournalDocument, context_id: &str) -> SessionResult<Context> {
    let context = doc
        .context(context_id)
        .cloned()
        .ok_or_else(|| SessionError::ContextNotFound(context_id.to_string()))?;
    doc.app_state.current_context_id = Some(context.id.clone());
    Ok(context)
}

/// Files `snapshot` at the end of `context_id` and maintains the projection.
fn insert_at_end(
    doc: &mut JournalDocument,
    mut snapshot: Snapshot,
    context_id: &str,
    now: DateTime<Utc>,
) -> SessionResult<Snapshot> {
    let sequence = doc.last_sequence(context_id) + 1;
    let context = doc
        .context_mut(context_id)
        .ok_or_else(|| SessionError::ContextNotFound(context_id.to_string()))?;
    context.snapshot_count += 1;
    context.touch(now);

    snapshot.context_id = context_id.to_string();
    snapshot.sequence = sequence;
    doc.snapshots.push(snapshot.clone());
    Ok(snapshot)
}

/// Removes a live snapshot and decrements its context's count.
fn detach(doc: &mut JournalDocument, snapshot_id: &str, now: DateTime<Utc>) -> SessionResult<Snapshot> {
    let snapshot = doc
        .take_snapshot(snapshot_id)
        .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()))?;
    if let Some(context) = doc.context_mut(&snapshot.context_id) {
        context.snapshot_count = context.snapshot_count.saturating_sub(1);
        context.touch(now);
    }
    Ok(snapshot)
}

fn trash_detached(doc: &mut JournalDocument, snapshot: Snapshot, now: DateTime<Utc>) -> TrashedSnapshot {
    let context_title = doc
        .context(&snapshot.context_id)
        .map(|context| context.title.clone())
        .unwrap_or_default();
    let trashed = TrashedSnapshot {
        snapshot,
        deleted_at: now,
        context_title,
    };
    doc.trashed_snapshots.push(trashed.clone());
    trashed
}

/// Appends to the current context, creating one when needed.
pub fn append_snapshot(doc: &mut JournalDocument, draft: NewSnapshot, now: DateTime<Utc>) -> SessionResult<Snapshot> {
    let context_id = ensure_current_context(doc, now);
    append_snapshot_to(doc, &context_id, draft, now)
}

pub fn append_snapshot_to(
    doc: &mut JournalDocument,
    context_id: &str,
    draft: NewSnapshot,
    now: DateTime<Utc>,
) -> SessionResult<Snapshot> {
    let snapshot = draft.into_snapshot(Uuid::new_v4().to_string(), context_id.to_string(), 0, now);
    insert_at_end(doc, snapshot, context_id, now)
}

fn last_in_current(doc: &JournalDocument) -> Option<String> {
    let context = doc.current_context()?;
    doc.last_snapshot_id(&context.id)
}

pub fn undo_last_capture(doc: &mut JournalDocument, now: DateTime<Utc>) -> SessionResult<TrashedSnapshot> {
    let snapshot_id = last_in_current(doc).ok_or(SessionError::NoCaptureToUndo)?;
    let snapshot = detach(doc, &snapshot_id, now)?;
    Ok(trash_detached(doc, snapshot, now))
}

pub fn promote_last_capture(
    doc: &mut JournalDocument,
    title: Option<&str>,
    now: DateTime<Utc>,
) -> SessionResult<(Context, Snapshot)> {
    let snapshot_id = last_in_current(doc).ok_or(SessionError::NoCaptureToPromote)?;
    move_to_new_context(doc, &snapshot_id, title, now)
}

pub fn move_to_current_context(
    doc: &mut JournalDocument,
    snapshot_id: &str,
    now: DateTime<Utc>,
) -> SessionResult<Snapshot> {
    let current = doc.snapshot(snapshot_id).map(|snapshot| snapshot.context_id.clone());
    let source_id = current.ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()))?;

    let destination = ensure_current_context(doc, now);
    if destination == source_id {
        return doc
            .snapshot(snapshot_id)
            .cloned()
            .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()));
    }

    let snapshot = detach(doc, snapshot_id, now)?;
    insert_at_end(doc, snapshot, &destination, now)
}

/// Moves a live snapshot into a fresh context, which becomes current.
pub fn move_to_new_context(
    doc: &mut JournalDocument,
    snapshot_id: &str,
    title: Option<&str>,
    now: DateTime<Utc>,
) -> SessionResult<(Context, Snapshot)> {
    if doc.snapshot(snapshot_id).is_none() {
        return Err(SessionError::SnapshotNotFound(snapshot_id.to_string()));
    }

    let snapshot = detach(doc, snapshot_id, now)?;
    let context = create_context(doc, title, now);
    let snapshot = insert_at_end(doc, snapshot, &context.id, now)?;
    let context = doc
        .context(&context.id)
        .cloned()
        .ok_or_else(|| SessionError::ContextNotFound(context.id.clone()))?;
    Ok((context, snapshot))
}

pub fn trash_snapshot(doc: &mut JournalDocument, snapshot_id: &str, now: DateTime<Utc>) -> SessionResult<TrashedSnapshot> {
    let snapshot = detach(doc, snapshot_id, now)?;
    Ok(trash_detached(doc, snapshot, now))
}

pub fn trash_context(doc: &mut JournalDocument, context_id: &str, now: DateTime<Utc>) -> SessionResult<TrashedContext> {
    let index = doc
        .contexts
        .iter()
        .position(|context| context.id == context_id)
        .ok_or_else(|| SessionError::ContextNotFound(context_id.to_string()))?;
    let context = doc.contexts.remove(index);

    let (mut snapshots, live): (Vec<Snapshot>, Vec<Snapshot>) = std::mem::take(&mut doc.snapshots)
        .into_iter()
        .partition(|snapshot| snapshot.context_id == context_id);
    doc.snapshots = live;
    snapshots.sort_by_key(|snapshot| snapshot.sequence);

    if doc.app_state.current_context_id.as_deref() == Some(context_id) {
        doc.app_state.current_context_id = None;
    }

    let trashed = TrashedContext {
        context,
        snapshots,
        deleted_at: now,
    };
    doc.trashed_contexts.push(trashed.clone());
    Ok(trashed)
}

/// Restores a trashed snapshot at the end of `to_context`, or of its original
/// context when that still exists, or of the current context.
pub fn restore_snapshot(
    doc: &mut JournalDocument,
    trashed_id: &str,
    to_context: Option<&str>,
    now: DateTime<Utc>,
) -> SessionResult<Snapshot> {
    let destination = match to_context {
        Some(context_id) => {
            if doc.context(context_id).is_none() {
                return Err(SessionError::ContextNotFound(context_id.to_string()));
            }
            Some(context_id.to_string())
        }
        None => None,
    };

    let index = doc
        .trashed_snapshots
        .iter()
        .position(|trashed| trashed.id() == trashed_id)
        .ok_or_else(|| SessionError::TrashedSnapshotNotFound(trashed_id.to_string()))?;
    let trashed = doc.trashed_snapshots.remove(index);

    let destination = match destination {
        Some(context_id) => context_id,
        None if doc.context(&trashed.snapshot.context_id).is_some() => {
            trashed.snapshot.context_id.clone()
        }
        None => ensure_current_context(doc, now),
    };

    insert_at_end(doc, trashed.snapshot, &destination, now)
}

/// Restores a trashed context with its snapshots renumbered from 1. A fresh id
/// is assigned when a live context already uses the original one.
pub fn restore_context(doc: &mut JournalDocument, trashed_id: &str, now: DateTime<Utc>) -> SessionResult<Context> {
    let index = doc
        .trashed_contexts
        .iter()
        .position(|trashed| trashed.id() == trashed_id)
        .ok_or_else(|| SessionError::TrashedContextNotFound(trashed_id.to_string()))?;
    let TrashedContext {
        mut context,
        mut snapshots,
        ..
    } = doc.trashed_contexts.remove(index);

    if doc.context(&context.id).is_some() {
        context.id = Uuid::new_v4().to_string();
    }
    context.snapshot_count = 0;
    context.touch(now);
    let context_id = context.id.clone();
    doc.contexts.push(context);

    snapshots.sort_by_key(|snapshot| snapshot.sequence);
    for snapshot in snapshots {
        insert_at_end(doc, snapshot, &context_id, now)?;
    }

    doc.context(&context_id)
        .cloned()
        .ok_or(SessionError::ContextNotFound(context_id))
}

pub fn rename_context(
    doc: &mut JournalDocument,
    context_id: &str,
    title: &str,
    now: DateTime<Utc>,
) -> SessionResult<Context> {
    let title = normalize_title(title)?;
    let context = doc
        .context_mut(context_id)
        .ok_or_else(|| SessionError::ContextNotFound(context_id.to_string()))?;
    context.title = title;
    context.touch(now);
    Ok(context.clone())
}

pub fn rename_snapshot(doc: &mut JournalDocument, snapshot_id: &str, title: &str) -> SessionResult<Snapshot> {
    let title = normalize_title(title)?;
    let snapshot = doc
        .snapshot_mut(snapshot_id)
        .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()))?;
    snapshot.title = title;
    Ok(snapshot.clone())
}

/// Permanently drops a trashed snapshot. Returns its id.
pub fn purge_trashed_snapshot(doc: &mut JournalDocument, trashed_id: &str) -> SessionResult<Vec<String>> {
    let index = doc
        .trashed_snapshots
        .iter()
        .position(|trashed| trashed.id() == trashed_id)
        .ok_or_else(|| SessionError::TrashedSnapshotNotFound(trashed_id.to_string()))?;
    let trashed = doc.trashed_snapshots.remove(index);
    Ok(vec![trashed.snapshot.id])
}

/// Permanently drops a trashed context. Returns the ids of its snapshots.
pub fn purge_trashed_context(doc: &mut JournalDocument, trashed_id: &str) -> SessionResult<Vec<String>> {
    let index = doc
        .trashed_contexts
        .iter()
        .position(|trashed| trashed.id() == trashed_id)
        .ok_or_else(|| SessionError::TrashedContextNotFound(trashed_id.to_string()))?;
    let trashed = doc.trashed_contexts.remove(index);
    Ok(trashed.snapshots.into_iter().map(|snapshot| snapshot.id).collect())
}

pub fn empty_trash(doc: &mut JournalDocument) -> Vec<String> {
    let mut purged: Vec<String> = doc
        .trashed_snapshots
        .drain(..)
        .map(|trashed| trashed.snapshot.id)
        .collect();
    for trashed in doc.trashed_contexts.drain(..) {
        purged.extend(trashed.snapshots.into_iter().map(|snapshot| snapshot.id));
    }
    purged
}

/// Dense contents of a context in sequence order, ready to paste elsewhere.
pub fn context_transcript(doc: &JournalDocument, context_id: &str) -> SessionResult<String> {
    let context = doc
        .context(context_id)
        .ok_or_else(|| SessionError::ContextNotFound(context_id.to_string()))?;

    let mut transcript = format!("# {}\n", context.title);
    for snapshot in doc.snapshots_in(context_id) {
        let body = if snapshot.dense_content.trim().is_empty() {
            snapshot.raw_content.trim()
        } else {
            snapshot.dense_content.trim()
        };
        transcript.push_str(&format!("\n## {}. {}\n{}\n", snapshot.sequence, snapshot.title, body));
    }
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaptureMethod, SnapshotStatus, SOURCE_FRONTMOST_WINDOW};
    use proptest::prelude::*;

    fn draft(label: &str) -> NewSnapshot {
        NewSnapshot {
            title: label.to_string(),
            source_type: SOURCE_FRONTMOST_WINDOW.to_string(),
            app_name: "Safari".into(),
            bundle_identifier: Some("com.apple.Safari".into()),
            window_title: "Docs".into(),
            capture_method: CaptureMethod::Accessibility,
            raw_content: format!("raw {label}"),
            filtered_combined_text: None,
            ocr_content: String::new(),
            dense_content: format!("dense {label}"),
            provider: Some("openai".into()),
            model: Some("gpt-4o-mini".into()),
            accessibility_line_count: 1,
            ocr_line_count: 0,
            processing_duration_ms: 12,
            status: SnapshotStatus::Ready,
            failure_message: None,
            retry_count: 0,
            last_attempt_at: None,
        }
    }

    fn sequences(doc: &JournalDocument, context_id: &str) -> Vec<u32> {
        doc.snapshots_in(context_id)
            .into_iter()
            .map(|snapshot| snapshot.sequence)
            .collect()
    }

    fn assert_counts_match(doc: &JournalDocument) {
        for context in &doc.contexts {
            assert_eq!(
                context.snapshot_count,
                doc.live_count(&context.id),
                "count drifted for {}",
                context.title
            );
        }
    }

    #[test]
    fn first_append_creates_default_context() {
        let mut doc = JournalDocument::default();
        let snapshot = append_snapshot(&mut doc, draft("a"), Utc::now()).unwrap();

        let context = doc.current_context().unwrap();
        assert_eq!(context.title, "Context 1");
        assert_eq!(snapshot.context_id, context.id);
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(context.snapshot_count, 1);
    }

    #[test]
    fn dangling_current_context_is_replaced() {
        let mut doc = JournalDocument::default();
        doc.app_state.current_context_id = Some("gone".into());
        let id = ensure_current_context(&mut doc, Utc::now());
        assert_ne!(id, "gone");
        assert_eq!(doc.app_state.current_context_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn create_context_uses_trimmed_title_or_numbered_default() {
        let mut doc = JournalDocument::default();
        let first = create_context(&mut doc, Some("  Trip planning  "), Utc::now());
        let second = create_context(&mut doc, Some("   "), Utc::now());
        assert_eq!(first.title, "Trip planning");
        assert_eq!(second.title, "Context 2");
        assert_eq!(doc.app_state.current_context_id, Some(second.id));
    }

    #[test]
    fn undo_then_restore_appends_at_end() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        for label in ["a", "b", "c"] {
            append_snapshot(&mut doc, draft(label), now).unwrap();
        }
        let context_id = doc.current_context().unwrap().id.clone();

        let trashed = undo_last_capture(&mut doc, now).unwrap();
        assert_eq!(trashed.snapshot.sequence, 3);
        assert_eq!(sequences(&doc, &context_id), vec![1, 2]);

        append_snapshot(&mut doc, draft("d"), now).unwrap();
        let prior_max = doc.last_sequence(&context_id);

        let restored = restore_snapshot(&mut doc, trashed.id(), Some(&context_id), now).unwrap();
        assert_eq!(restored.id, trashed.snapshot.id);
        assert_eq!(restored.raw_content, trashed.snapshot.raw_content);
        assert_eq!(restored.sequence, prior_max + 1);
        assert!(doc.trashed_snapshots.is_empty());
        assert_counts_match(&doc);
    }

    #[test]
    fn undo_without_captures_fails() {
        let mut doc = JournalDocument::default();
        assert!(matches!(
            undo_last_capture(&mut doc, Utc::now()),
            Err(SessionError::NoCaptureToUndo)
        ));
        create_context(&mut doc, None, Utc::now());
        assert!(matches!(
            undo_last_capture(&mut doc, Utc::now()),
            Err(SessionError::NoCaptureToUndo)
        ));
    }

    #[test]
    fn promote_moves_last_capture_to_fresh_current_context() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        append_snapshot(&mut doc, draft("a"), now).unwrap();
        let mut failed = draft("b");
        failed.status = SnapshotStatus::Failed;
        failed.failure_message = Some("timeout".into());
        let last = append_snapshot(&mut doc, failed, now).unwrap();
        let source_id = last.context_id.clone();

        let (context, promoted) = promote_last_capture(&mut doc, Some("Follow-up"), now).unwrap();
        assert_eq!(context.title, "Follow-up");
        assert_eq!(context.snapshot_count, 1);
        assert_eq!(promoted.id, last.id);
        assert_eq!(promoted.sequence, 1);
        assert_eq!(promoted.status, SnapshotStatus::Failed);
        assert_eq!(promoted.failure_message.as_deref(), Some("timeout"));
        assert_eq!(doc.app_state.current_context_id.as_deref(), Some(context.id.as_str()));
        assert!(doc.trashed_snapshots.is_empty(), "promote must not trash");
        assert_eq!(doc.context(&source_id).unwrap().snapshot_count, 1);
        assert_counts_match(&doc);
    }

    #[test]
    fn promote_with_empty_current_context_fails() {
        let mut doc = JournalDocument::default();
        create_context(&mut doc, None, Utc::now());
        assert!(matches!(
            promote_last_capture(&mut doc, None, Utc::now()),
            Err(SessionError::NoCaptureToPromote)
        ));
    }

    #[test]
    fn move_to_current_context_renumbers_at_end() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let first = create_context(&mut doc, Some("First"), now);
        let moved = append_snapshot(&mut doc, draft("a"), now).unwrap();
        append_snapshot(&mut doc, draft("b"), now).unwrap();

        let second = create_context(&mut doc, Some("Second"), now);
        append_snapshot(&mut doc, draft("c"), now).unwrap();

        let result = move_to_current_context(&mut doc, &moved.id, now).unwrap();
        assert_eq!(result.context_id, second.id);
        assert_eq!(result.sequence, 2);
        assert_eq!(doc.context(&first.id).unwrap().snapshot_count, 1);
        assert_eq!(doc.context(&second.id).unwrap().snapshot_count, 2);
        assert_counts_match(&doc);
    }

    #[test]
    fn move_within_same_context_is_a_no_op() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let snapshot = append_snapshot(&mut doc, draft("a"), now).unwrap();
        append_snapshot(&mut doc, draft("b"), now).unwrap();

        let result = move_to_current_context(&mut doc, &snapshot.id, now).unwrap();
        assert_eq!(result.sequence, 1);
        assert_counts_match(&doc);
    }

    #[test]
    fn trashing_current_context_clears_selection_and_keeps_order() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let context = create_context(&mut doc, Some("Doomed"), now);
        for label in ["a", "b", "c"] {
            append_snapshot(&mut doc, draft(label), now).unwrap();
        }
        // Shuffle storage order; trash must still order by sequence.
        doc.snapshots.reverse();

        let trashed = trash_context(&mut doc, &context.id, now).unwrap();
        assert!(doc.app_state.current_context_id.is_none());
        assert!(doc.context(&context.id).is_none());
        assert!(doc.snapshots.is_empty());
        assert_eq!(doc.trashed_contexts.len(), 1);
        let order: Vec<u32> = trashed.snapshots.iter().map(|s| s.sequence).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn restored_context_gets_fresh_id_on_collision() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let context = create_context(&mut doc, Some("Original"), now);
        append_snapshot(&mut doc, draft("a"), now).unwrap();
        append_snapshot(&mut doc, draft("b"), now).unwrap();
        let trashed = trash_context(&mut doc, &context.id, now).unwrap();

        // A live context now occupies the original id.
        let mut squatter = Context::new("Squatter".into(), now);
        squatter.id = context.id.clone();
        doc.contexts.push(squatter);

        let restored = restore_context(&mut doc, trashed.id(), now).unwrap();
        assert_ne!(restored.id, context.id);
        assert_eq!(restored.title, "Original");
        assert_eq!(restored.snapshot_count, 2);
        assert_eq!(sequences(&doc, &restored.id), vec![1, 2]);
        let ids: Vec<&str> = doc
            .snapshots_in(&restored.id)
            .into_iter()
            .map(|snapshot| snapshot.id.as_str())
            .collect();
        let original_ids: Vec<&str> = trashed.snapshots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, original_ids);
        assert_counts_match(&doc);
    }

    #[test]
    fn restore_snapshot_without_target_falls_back_to_current() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let original = create_context(&mut doc, Some("Original"), now);
        let snapshot = append_snapshot(&mut doc, draft("a"), now).unwrap();
        trash_snapshot(&mut doc, &snapshot.id, now).unwrap();
        trash_context(&mut doc, &original.id, now).unwrap();

        let restored = restore_snapshot(&mut doc, &snapshot.id, None, now).unwrap();
        let current = doc.current_context().unwrap();
        assert_ne!(current.id, original.id);
        assert_eq!(restored.context_id, current.id);
        assert_eq!(restored.sequence, 1);
    }

    #[test]
    fn renames_trim_and_reject_blank_titles() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let snapshot = append_snapshot(&mut doc, draft("a"), now).unwrap();
        let context_id = snapshot.context_id.clone();
        let later = now + chrono::Duration::seconds(5);

        let context = rename_context(&mut doc, &context_id, "  Renamed ", later).unwrap();
        assert_eq!(context.title, "Renamed");
        assert_eq!(context.updated_at, later);

        let renamed = rename_snapshot(&mut doc, &snapshot.id, "\tNew title\n").unwrap();
        assert_eq!(renamed.title, "New title");

        assert!(matches!(
            rename_snapshot(&mut doc, &snapshot.id, "   "),
            Err(SessionError::EmptyTitle)
        ));
    }

    #[test]
    fn empty_trash_reports_every_purged_snapshot() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let single = append_snapshot(&mut doc, draft("a"), now).unwrap();
        trash_snapshot(&mut doc, &single.id, now).unwrap();
        let context = create_context(&mut doc, None, now);
        let inner = append_snapshot(&mut doc, draft("b"), now).unwrap();
        trash_context(&mut doc, &context.id, now).unwrap();

        let mut purged = empty_trash(&mut doc);
        purged.sort();
        let mut expected = vec![single.id, inner.id];
        expected.sort();
        assert_eq!(purged, expected);
        assert!(doc.trashed_snapshots.is_empty());
        assert!(doc.trashed_contexts.is_empty());
    }

    #[test]
    fn transcript_lists_snapshots_in_sequence_order() {
        let now = Utc::now();
        let mut doc = JournalDocument::default();
        let context = create_context(&mut doc, Some("Notes"), now);
        append_snapshot(&mut doc, draft("one"), now).unwrap();
        append_snapshot(&mut doc, draft("two"), now).unwrap();

        let transcript = context_transcript(&doc, &context.id).unwrap();
        let first = transcript.find("dense one").unwrap();
        let second = transcript.find("dense two").unwrap();
        assert!(transcript.starts_with("# Notes"));
        assert!(first < second);
    }

    proptest! {
        #[test]
        fn appends_number_one_to_n(n in 1usize..40) {
            let now = Utc::now();
            let mut doc = JournalDocument::default();
            for index in 0..n {
                append_snapshot(&mut doc, draft(&index.to_string()), now).unwrap();
            }
            let context_id = doc.current_context().unwrap().id.clone();
            let expected: Vec<u32> = (1..=n as u32).collect();
            prop_assert_eq!(sequences(&doc, &context_id), expected);
        }

        #[test]
        fn count_tracks_appends_minus_removals(appends in 0usize..30, removals in 0usize..40) {
            let now = Utc::now();
            let mut doc = JournalDocument::default();
            let context = create_context(&mut doc, None, now);
            for index in 0..appends {
                append_snapshot(&mut doc, draft(&index.to_string()), now).unwrap();
            }
            for _ in 0..removals {
                let _ = undo_last_capture(&mut doc, now);
            }
            let count = doc.context(&context.id).unwrap().snapshot_count as usize;
            prop_assert_eq!(count, appends.saturating_sub(removals));
            prop_assert_eq!(count, doc.live_count(&context.id) as usize);
        }

        #[test]
        fn mixed_operations_preserve_invariants(ops in proptest::collection::vec(0u8..6, 1..60)) {
            let now = Utc::now();
            let mut doc = JournalDocument::default();
            for op in ops {
                match op {
                    0 | 1 => { append_snapshot(&mut doc, draft("x"), now).unwrap(); }
                    2 => { let _ = undo_last_capture(&mut doc, now); }
                    3 => { let _ = promote_last_capture(&mut doc, None, now); }
                    4 => {
                        if let Some(trashed) = doc.trashed_snapshots.first().map(|t| t.id().to_string()) {
                            restore_snapshot(&mut doc, &trashed, None, now).unwrap();
                        }
                    }
                    _ => { create_context(&mut doc, None, now); }
                }
            }
            for context in &doc.contexts {
                prop_assert_eq!(context.snapshot_count, doc.live_count(&context.id));
                let seqs = sequences(&doc, &context.id);
                prop_assert!(seqs.windows(2).all(|pair| pair[0] < pair[1]));
            }
        }
    }
}
