use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::models::CaptureMethod;

use super::attributes::{AttributePlan, ROOT_ATTRIBUTES};
use super::bridge::{
    AccessibilityTree, AttributeValue, FrontmostApplication, NodeRef, OcrEngine, ScreenCapture,
};
use super::merge::merge;
use super::text::dedup_lines;
use super::traversal::{Traversal, TraversalStop};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotSource {
    Window,
    Display,
    None,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDiagnostics {
    pub accessibility_line_count: u32,
    pub ocr_line_count: u32,
    pub processing_duration_ms: u64,
    pub nodes_visited: usize,
    pub traversal_stop: TraversalStop,
    pub screenshot_source: ScreenshotSource,
}

/// Text pulled from the frontmost window, before densification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedSnapshot {
    pub app_name: String,
    pub bundle_identifier: Option<String>,
    pub window_title: String,
    pub capture_method: CaptureMethod,
    pub accessibility_text: String,
    pub ocr_text: String,
    pub combined_text: String,
    pub filtered_combined_text: Option<String>,
    pub diagnostics: CaptureDiagnostics,
    pub captured_at: DateTime<Utc>,
}

impl CapturedSnapshot {
    /// Title used when the densifier does not supply one.
    pub fn fallback_title(&self) -> String {
        if self.window_title.trim().is_empty() {
            self.app_name.clone()
        } else {
            self.window_title.clone()
        }
    }
}

struct ScreenshotPass {
    image: Option<DynamicImage>,
    source: ScreenshotSource,
    lines: Vec<String>,
}

/// Reads the frontmost window through the accessibility tree and, in
/// parallel, through a screenshot run past OCR.
#[derive(Clone)]
pub struct CaptureEngine {
    tree: Arc<dyn AccessibilityTree>,
    screen: Arc<dyn ScreenCapture>,
    ocr: Arc<dyn OcrEngine>,
    plan: Arc<AttributePlan>,
    config: CaptureConfig,
}

impl CaptureEngine {
    pub fn new(
        tree: Arc<dyn AccessibilityTree>,
        screen: Arc<dyn ScreenCapture>,
        ocr: Arc<dyn OcrEngine>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            tree,
            screen,
            ocr,
            plan: Arc::new(AttributePlan::default()),
            config,
        }
    }

    /// Captures the frontmost application. The screenshot, when one was
    /// taken, is returned alongside so the caller can keep it.
    pub async fn capture(&self) -> Result<(CapturedSnapshot, Option<DynamicImage>), CaptureError> {
        let started = Instant::now();
        let captured_at = Utc::now();

        let app = self
            .tree
            .frontmost_application()
            .ok_or(CaptureError::NoFrontmostApplication)?;
        self.reject_self_capture(&app)?;

        let window_title = window_title(self.tree.as_ref(), app.root).unwrap_or_default();
        let roots = traversal_roots(self.tree.as_ref(), app.root);
        log_debug!(
            "Capturing {} (pid {}), {} traversal roots",
            app.name,
            app.process_id,
            roots.len()
        );

        let deadline = started + self.config.budgets.deadline();
        let traversal_task = tokio::task::spawn_blocking({
            let tree = Arc::clone(&self.tree);
            let plan = Arc::clone(&self.plan);
            let budgets = self.config.budgets.clone();
            move || Traversal::new(tree.as_ref(), &plan, &budgets, deadline).run(&roots)
        });

        let screenshot_task = tokio::task::spawn_blocking({
            let screen = Arc::clone(&self.screen);
            let ocr = Arc::clone(&self.ocr);
            let process_id = app.process_id;
            let max_edge = self.config.max_screenshot_edge;
            move || screenshot_pass(screen.as_ref(), ocr.as_ref(), process_id, max_edge)
        });

        let (traversal, screenshot) = tokio::join!(traversal_task, screenshot_task);
        let traversal = traversal.context("accessibility traversal worker join failed")?;
        let screenshot = screenshot.context("screenshot worker join failed")?;

        if traversal.stop != TraversalStop::Exhausted {
            log_info!(
                "Traversal of {} stopped early ({:?}) after {} nodes",
                app.name,
                traversal.stop,
                traversal.nodes_visited
            );
        }

        let merged = merge(
            &traversal.lines,
            &screenshot.lines,
            &app.name,
            Some(window_title.as_str()),
        );
        let processing_duration_ms = started.elapsed().as_millis() as u64;

        let snapshot = CapturedSnapshot {
            app_name: app.name,
            bundle_identifier: app.bundle_identifier,
            window_title,
            capture_method: merged.method,
            accessibility_text: traversal.lines.join("\n"),
            ocr_text: screenshot.lines.join("\n"),
            combined_text: merged.combined,
            filtered_combined_text: merged.filtered,
            diagnostics: CaptureDiagnostics {
                accessibility_line_count: traversal.lines.len() as u32,
                ocr_line_count: screenshot.lines.len() as u32,
                processing_duration_ms,
                nodes_visited: traversal.nodes_visited,
                traversal_stop: traversal.stop,
                screenshot_source: screenshot.source,
            },
            captured_at,
        };

        log_info!(
            "Captured {} via {}: {} accessibility lines, {} OCR lines in {}ms",
            snapshot.app_name,
            snapshot.capture_method,
            snapshot.diagnostics.accessibility_line_count,
            snapshot.diagnostics.ocr_line_count,
            processing_duration_ms
        );

        Ok((snapshot, screenshot.image))
    }

    fn reject_self_capture(&self, app: &FrontmostApplication) -> Result<(), CaptureError> {
        let same_process = app.process_id == std::process::id();
        let same_bundle = match (&self.config.own_bundle_identifier, &app.bundle_identifier) {
            (Some(own), Some(frontmost)) => own == frontmost,
            _ => false,
        };
        if same_process || same_bundle {
            return Err(CaptureError::CaptureTargetIsSelf {
                app_name: app.name.clone(),
            });
        }
        Ok(())
    }
}

/// Focused window title, then main window, then the focused element.
fn window_title(tree: &dyn AccessibilityTree, app_root: NodeRef) -> Option<String> {
    ["AXFocusedWindow", "AXMainWindow", "AXFocusedUIElement"]
        .iter()
        .filter_map(|attribute| match tree.attribute_value(app_root, attribute) {
            Some(AttributeValue::Node(node)) => Some(node),
            _ => None,
        })
        .find_map(|node| match tree.attribute_value(node, "AXTitle") {
            Some(AttributeValue::Text(title)) if !title.trim().is_empty() => {
                Some(title.trim().to_string())
            }
            _ => None,
        })
}

fn traversal_roots(tree: &dyn AccessibilityTree, app_root: NodeRef) -> Vec<NodeRef> {
    let mut roots = Vec::new();
    let mut seen = HashSet::new();
    let mut add = |node: NodeRef| {
        if seen.insert(node) {
            roots.push(node);
        }
    };

    for attribute in ROOT_ATTRIBUTES {
        match tree.attribute_value(app_root, attribute) {
            Some(AttributeValue::Node(node)) => add(node),
            Some(AttributeValue::Array(items)) => {
                for item in items {
                    if let AttributeValue::Node(node) = item {
                        add(node);
                    }
                }
            }
            _ => {}
        }
    }
    add(app_root);
    roots
}

fn screenshot_pass(
    screen: &dyn ScreenCapture,
    ocr: &dyn OcrEngine,
    process_id: u32,
    max_edge: u32,
) -> ScreenshotPass {
    let (image, source) = match screen.capture_window_image(process_id) {
        Some(image) => (image, ScreenshotSource::Window),
        None => match screen.capture_display_image() {
            Some(image) => (image, ScreenshotSource::Display),
            None => {
                log_warn!("No screenshot available for pid {}", process_id);
                return ScreenshotPass {
                    image: None,
                    source: ScreenshotSource::None,
                    lines: Vec::new(),
                };
            }
        },
    };

    let image = downscale(image, max_edge);
    let lines = match ocr.recognize_text(&image) {
        Ok(lines) => dedup_lines(lines),
        Err(err) => {
            log_warn!("OCR failed, continuing without OCR text: {err:#}");
            Vec::new()
        }
    };

    ScreenshotPass {
        image: Some(image),
        source,
        lines,
    }
}

/// Shrinks `image` so its longest edge is at most `max_edge`, keeping the
/// aspect ratio.
pub fn downscale(image: DynamicImage, max_edge: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if max_edge == 0 || width.max(height) <= max_edge {
        return image;
    }
    image.resize(max_edge, max_edge, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fakes::{node, text, FakeOcr, FakeScreen, FakeTree};
    use std::sync::atomic::Ordering;

    const OTHER_PID: u32 = 4242;

    fn mail_tree() -> FakeTree {
        let mut tree = FakeTree::with_app("Mail", OTHER_PID, Some("com.apple.mail"));
        tree.set(
            0,
            vec![
                ("AXFocusedWindow", node(1)),
                ("AXWindows", AttributeValue::Array(vec![node(1), node(3)])),
                ("AXTitle", text("Mail")),
            ],
        );
        tree.set(
            1,
            vec![
                ("AXTitle", text("Inbox")),
                ("AXChildren", AttributeValue::Array(vec![node(2)])),
            ],
        );
        tree.set(2, vec![("AXValue", text("Quarterly report attached"))]);
        tree.set(3, vec![("AXTitle", text("Drafts"))]);
        tree
    }

    fn engine(tree: FakeTree, screen: FakeScreen, ocr: Arc<FakeOcr>) -> CaptureEngine {
        CaptureEngine::new(Arc::new(tree), Arc::new(screen), ocr, CaptureConfig::default())
    }

    #[tokio::test]
    async fn hybrid_capture_merges_both_sources() {
        let ocr = Arc::new(FakeOcr::returning(&["Inbox 12", "Inbox 12"]));
        let engine = engine(mail_tree(), FakeScreen::window(800, 600), Arc::clone(&ocr));

        let (snapshot, image) = engine.capture().await.unwrap();
        assert_eq!(snapshot.app_name, "Mail");
        assert_eq!(snapshot.window_title, "Inbox");
        assert_eq!(snapshot.capture_method, CaptureMethod::Hybrid);
        assert_eq!(
            snapshot.accessibility_text,
            "Inbox\nQuarterly report attached\nDrafts\nMail"
        );
        assert_eq!(snapshot.ocr_text, "Inbox 12");
        assert!(snapshot.combined_text.starts_with("[Accessibility Text]\nInbox"));
        assert_eq!(snapshot.diagnostics.ocr_line_count, 1);
        assert_eq!(snapshot.diagnostics.screenshot_source, ScreenshotSource::Window);
        assert!(image.is_some());
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ocr_failure_is_not_fatal() {
        let engine = engine(mail_tree(), FakeScreen::window(10, 10), Arc::new(FakeOcr::failing()));
        let (snapshot, _) = engine.capture().await.unwrap();
        assert_eq!(snapshot.capture_method, CaptureMethod::Accessibility);
        assert_eq!(snapshot.ocr_text, "");
    }

    #[tokio::test]
    async fn nothing_readable_yields_placeholder() {
        let tree = FakeTree::with_app("Kiosk", OTHER_PID, None);
        let engine = engine(tree, FakeScreen::none(), Arc::new(FakeOcr::returning(&[])));

        let (snapshot, image) = engine.capture().await.unwrap();
        assert_eq!(snapshot.capture_method, CaptureMethod::None);
        assert!(snapshot.combined_text.contains("Kiosk"));
        assert!(image.is_none());
        assert_eq!(snapshot.diagnostics.screenshot_source, ScreenshotSource::None);
    }

    #[tokio::test]
    async fn display_is_the_screenshot_fallback() {
        let screen = FakeScreen {
            window: None,
            display: Some((64, 32)),
        };
        let engine = engine(
            FakeTree::with_app("Preview", OTHER_PID, None),
            screen,
            Arc::new(FakeOcr::returning(&["page one"])),
        );

        let (snapshot, _) = engine.capture().await.unwrap();
        assert_eq!(snapshot.diagnostics.screenshot_source, ScreenshotSource::Display);
        assert_eq!(snapshot.capture_method, CaptureMethod::ScreenshotOcr);
        assert_eq!(snapshot.combined_text, "page one");
    }

    #[tokio::test]
    async fn missing_frontmost_app_is_an_error() {
        let engine = engine(FakeTree::default(), FakeScreen::none(), Arc::new(FakeOcr::returning(&[])));
        let err = engine.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::NoFrontmostApplication));
    }

    #[tokio::test]
    async fn own_process_and_bundle_are_refused() {
        let tree = FakeTree::with_app("Journal", std::process::id(), None);
        let engine = engine(tree, FakeScreen::none(), Arc::new(FakeOcr::returning(&[])));
        let err = engine.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::CaptureTargetIsSelf { .. }));

        let mut config = CaptureConfig::default();
        config.own_bundle_identifier = Some("com.example.journal".into());
        let engine = CaptureEngine::new(
            Arc::new(FakeTree::with_app("Journal", OTHER_PID, Some("com.example.journal"))),
            Arc::new(FakeScreen::none()),
            Arc::new(FakeOcr::returning(&[])),
            config,
        );
        let err = engine.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::CaptureTargetIsSelf { .. }));
    }

    #[tokio::test]
    async fn deep_tree_is_bounded() {
        let mut tree = FakeTree::chain(10_000);
        tree.app = FakeTree::with_app("Deep", OTHER_PID, None).app;
        let engine = engine(tree, FakeScreen::none(), Arc::new(FakeOcr::returning(&[])));

        let (snapshot, _) = engine.capture().await.unwrap();
        assert_eq!(snapshot.diagnostics.nodes_visited, 49);
        assert_eq!(snapshot.diagnostics.accessibility_line_count, 49);
    }

    #[test]
    fn downscale_bounds_longest_edge() {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::new(4800, 1200));
        let scaled = downscale(image, 2400);
        assert_eq!(scaled.dimensions(), (2400, 600));

        let small = DynamicImage::ImageRgba8(image::RgbaImage::new(100, 50));
        assert_eq!(downscale(small, 2400).dimensions(), (100, 50));
    }
}
