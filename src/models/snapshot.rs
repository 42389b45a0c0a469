//! Snapshot data model.
//!
//! One captured-and-densified unit of content appended to a context.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source tag written on snapshots produced by the capture workflow.
pub const SOURCE_FRONTMOST_WINDOW: &str = "frontmost_window";

/// Which extraction sources yielded non-empty text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    Accessibility,
    ScreenshotOcr,
    Hybrid,
    #[serde(other)]
    None,
}

impl CaptureMethod {
    pub fn from_sources(has_accessibility_text: bool, has_ocr_text: bool) -> Self {
        match (has_accessibility_text, has_ocr_text) {
            (true, true) => CaptureMethod::Hybrid,
            (true, false) => CaptureMethod::Accessibility,
            (false, true) => CaptureMethod::ScreenshotOcr,
            (false, false) => CaptureMethod::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::Accessibility => "accessibility",
            CaptureMethod::ScreenshotOcr => "screenshot_ocr",
            CaptureMethod::Hybrid => "hybrid",
            CaptureMethod::None => "none",
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    #[default]
    Ready,
    /// Unknown statuses land here so the snapshot stays retryable.
    #[serde(other)]
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub context_id: String,
    pub created_at: DateTime<Utc>,
    pub sequence: u32,
    pub title: String,
    pub source_type: String,
    pub app_name: String,
    #[serde(default)]
    pub bundle_identifier: Option<String>,
    pub window_title: String,
    pub capture_method: CaptureMethod,
    pub raw_content: String,
    #[serde(default)]
    pub filtered_combined_text: Option<String>,
    #[serde(default)]
    pub ocr_content: String,
    #[serde(default)]
    pub dense_content: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub accessibility_line_count: u32,
    #[serde(default)]
    pub ocr_line_count: u32,
    #[serde(default)]
    pub processing_duration_ms: u64,
    #[serde(default)]
    pub status: SnapshotStatus,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_failed(&self) -> bool {
        self.status == SnapshotStatus::Failed
    }

    /// Text handed to the densifier: the noise-filtered merge when one was
    /// recorded, the raw merge otherwise.
    pub fn densify_input(&self) -> &str {
        self.filtered_combined_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(&self.raw_content)
    }
}

/// Everything needed to append a snapshot except the fields the session
/// manager owns (`id`, `contextId`, `sequence`, `createdAt`).
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub title: String,
    pub source_type: String,
    pub app_name: String,
    pub bundle_identifier: Option<String>,
    pub window_title: String,
    pub capture_method: CaptureMethod,
    pub raw_content: String,
    pub filtered_combined_text: Option<String>,
    pub ocr_content: String,
    pub dense_content: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub accessibility_line_count: u32,
    pub ocr_line_count: u32,
    pub processing_duration_ms: u64,
    pub status: SnapshotStatus,
    pub failure_message: Option<String>,
    pub retry_count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl NewSnapshot {
    pub fn into_snapshot(
        self,
        id: String,
        context_id: String,
        sequence: u32,
        created_at: DateTime<Utc>,
    ) -> Snapshot {
        Snapshot {
            id,
            context_id,
            created_at,
            sequence,
            title: self.title,
            source_type: self.source_type,
            app_name: self.app_name,
            bundle_identifier: self.bundle_identifier,
            window_title: self.window_title,
            capture_method: self.capture_method,
            raw_content: self.raw_content,
            filtered_combined_text: self.filtered_combined_text,
            ocr_content: self.ocr_content,
            dense_content: self.dense_content,
            provider: self.provider,
            model: self.model,
            accessibility_line_count: self.accessibility_line_count,
            ocr_line_count: self.ocr_line_count,
            processing_duration_ms: self.processing_duration_ms,
            status: self.status,
            failure_message: self.failure_message,
            retry_count: self.retry_count,
            last_attempt_at: self.last_attempt_at,
        }
    }
}
