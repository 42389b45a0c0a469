//! Frontmost-window capture: accessibility traversal plus screenshot OCR.

pub mod attributes;
pub mod bridge;
mod engine;
pub mod merge;
pub mod text;
pub mod traversal;

#[cfg(test)]
pub(crate) mod fakes;

pub use bridge::{
    AccessibilityTree, AttributeValue, FrontmostApplication, NodeRef, OcrEngine, ScreenCapture,
};
pub use engine::{downscale, CaptureDiagnostics, CaptureEngine, CapturedSnapshot, ScreenshotSource};
pub use traversal::{TraversalOutcome, TraversalStop};
