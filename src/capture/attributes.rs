//! Which accessibility attributes to read, and in what order.
//!
//! Text-bearing attributes come first so that a walk cut short by a budget has
//! already collected the useful text of every node it reached. Structural
//! attributes follow, then whatever else the node reports. The ignore list
//! never gets read.

/// Text-bearing attributes in priority order.
pub const TEXT_ATTRIBUTES: &[&str] = &[
    "AXTitle",
    "AXValue",
    "AXDescription",
    "AXHelp",
    "AXDocument",
    "AXURL",
    "AXLabelValue",
    "AXPlaceholderValue",
    "AXRoleDescription",
    "AXSelectedText",
    "AXFilename",
    "AXIdentifier",
];

/// Attributes that lead to child elements, in priority order.
pub const STRUCTURAL_ATTRIBUTES: &[&str] = &[
    "AXChildren",
    "AXVisibleChildren",
    "AXContents",
    "AXRows",
    "AXVisibleRows",
    "AXColumns",
    "AXCells",
    "AXTabs",
    "AXSelectedChildren",
    "AXMenuBar",
    "AXSheets",
];

/// Geometry, back-references and selection ranges, plus raw role tokens
/// (`AXGroup`, `AXButton`) whose readable form is `AXRoleDescription`.
pub const IGNORED_ATTRIBUTES: &[&str] = &[
    "AXRole",
    "AXSubrole",
    "AXPosition",
    "AXSize",
    "AXFrame",
    "AXParent",
    "AXWindow",
    "AXTopLevelUIElement",
    "AXSelectedTextRange",
    "AXSelectedTextRanges",
    "AXVisibleCharacterRange",
    "AXInsertionPointLineNumber",
];

/// Attributes on the application element that yield traversal roots, in the
/// order they are tried. The application element itself comes last.
pub const ROOT_ATTRIBUTES: &[&str] = &[
    "AXFocusedUIElement",
    "AXFocusedWindow",
    "AXMainWindow",
    "AXWindows",
    "AXMenuBar",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeCategory {
    Text,
    Structural,
    Other,
    Ignored,
}

/// Declared attribute ordering, consulted against each node's discovered set.
#[derive(Debug, Clone)]
pub struct AttributePlan {
    text: Vec<String>,
    structural: Vec<String>,
    ignored: Vec<String>,
}

impl Default for AttributePlan {
    fn default() -> Self {
        Self::new(TEXT_ATTRIBUTES, STRUCTURAL_ATTRIBUTES, IGNORED_ATTRIBUTES)
    }
}

impl AttributePlan {
    pub fn new(text: &[&str], structural: &[&str], ignored: &[&str]) -> Self {
        let owned = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        Self {
            text: owned(text),
            structural: owned(structural),
            ignored: owned(ignored),
        }
    }

    pub fn categorize(&self, name: &str) -> AttributeCategory {
        if self.ignored.iter().any(|n| n == name) {
            AttributeCategory::Ignored
        } else if self.text.iter().any(|n| n == name) {
            AttributeCategory::Text
        } else if self.structural.iter().any(|n| n == name) {
            AttributeCategory::Structural
        } else {
            AttributeCategory::Other
        }
    }

    /// Orders `discovered` for reading: text attributes by priority, then
    /// structural by priority, then the rest in discovery order. Ignored and
    /// duplicate names are dropped.
    pub fn order(&self, discovered: &[String]) -> Vec<String> {
        let mut ordered: Vec<String> = Vec::with_capacity(discovered.len());

        for preferred in self.text.iter().chain(self.structural.iter()) {
            if discovered.iter().any(|name| name == preferred) {
                ordered.push(preferred.clone());
            }
        }

        for name in discovered {
            if self.categorize(name) == AttributeCategory::Other && !ordered.contains(name) {
                ordered.push(name.clone());
            }
        }

        ordered
    }
}
