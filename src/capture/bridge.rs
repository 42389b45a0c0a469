//! Boundary to the OS introspection, screen capture and OCR services.
//!
//! The host app implements these over its native bridge; the capture engine
//! only sees the traits.

use anyhow::Result;
use image::DynamicImage;

/// Opaque, comparable identity of one UI element. Two handles are equal when
/// they refer to the same element, which is what cycle detection relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Node(NodeRef),
    Array(Vec<AttributeValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontmostApplication {
    pub process_id: u32,
    pub name: String,
    pub bundle_identifier: Option<String>,
    /// Application element the traversal roots hang off.
    pub root: NodeRef,
}

pub trait AccessibilityTree: Send + Sync {
    fn frontmost_application(&self) -> Option<FrontmostApplication>;

    fn attribute_names(&self, node: NodeRef) -> Vec<String>;

    fn attribute_value(&self, node: NodeRef, name: &str) -> Option<AttributeValue>;
}

pub trait ScreenCapture: Send + Sync {
    fn capture_window_image(&self, process_id: u32) -> Option<DynamicImage>;

    fn capture_display_image(&self) -> Option<DynamicImage>;
}

pub trait OcrEngine: Send + Sync {
    fn recognize_text(&self, image: &DynamicImage) -> Result<Vec<String>>;
}
