//! In-memory collaborators for capture tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbaImage};

use super::bridge::{
    AccessibilityTree, AttributeValue, FrontmostApplication, NodeRef, OcrEngine, ScreenCapture,
};

/// Node id -> attributes in discovery order.
#[derive(Default)]
pub struct FakeTree {
    pub app: Option<FrontmostApplication>,
    nodes: HashMap<NodeRef, Vec<(String, AttributeValue)>>,
}

impl FakeTree {
    pub fn with_app(name: &str, process_id: u32, bundle: Option<&str>) -> Self {
        Self {
            app: Some(FrontmostApplication {
                process_id,
                name: name.to_string(),
                bundle_identifier: bundle.map(str::to_string),
                root: NodeRef(0),
            }),
            nodes: HashMap::new(),
        }
    }

    pub fn set(&mut self, node: u64, attributes: Vec<(&str, AttributeValue)>) {
        self.nodes.insert(
            NodeRef(node),
            attributes
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        );
    }

    /// Chain 0 -> 1 -> ... -> length-1, one title line per node.
    pub fn chain(length: u64) -> Self {
        let mut tree = Self::default();
        for id in 0..length {
            tree.set(
                id,
                vec![
                    ("AXTitle", AttributeValue::Text(format!("node {id}"))),
                    ("AXChildren", AttributeValue::Array(vec![node(id + 1)])),
                ],
            );
        }
        tree
    }
}

pub fn text(value: &str) -> AttributeValue {
    AttributeValue::Text(value.to_string())
}

pub fn node(id: u64) -> AttributeValue {
    AttributeValue::Node(NodeRef(id))
}

impl AccessibilityTree for FakeTree {
    fn frontmost_application(&self) -> Option<FrontmostApplication> {
        self.app.clone()
    }

    fn attribute_names(&self, node: NodeRef) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(|attrs| attrs.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    fn attribute_value(&self, node: NodeRef, name: &str) -> Option<AttributeValue> {
        self.nodes
            .get(&node)?
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.clone())
    }
}

pub struct FakeScreen {
    pub window: Option<(u32, u32)>,
    pub display: Option<(u32, u32)>,
}

impl FakeScreen {
    pub fn none() -> Self {
        Self {
            window: None,
            display: None,
        }
    }

    pub fn window(width: u32, height: u32) -> Self {
        Self {
            window: Some((width, height)),
            display: None,
        }
    }
}

fn blank((width, height): (u32, u32)) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
}

impl ScreenCapture for FakeScreen {
    fn capture_window_image(&self, _process_id: u32) -> Option<DynamicImage> {
        self.window.map(blank)
    }

    fn capture_display_image(&self) -> Option<DynamicImage> {
        self.display.map(blank)
    }
}

pub struct FakeOcr {
    pub lines: Vec<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeOcr {
    pub fn returning(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            lines: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl OcrEngine for FakeOcr {
    fn recognize_text(&self, _image: &DynamicImage) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("vision request failed"));
        }
        Ok(self.lines.clone())
    }
}
