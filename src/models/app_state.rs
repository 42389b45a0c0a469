use serde::{Deserialize, Deserializer, Serialize};

use crate::densify::Provider;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub current_context_id: Option<String>,
    pub has_completed_onboarding: bool,
    pub has_launched_before: bool,
    #[serde(deserialize_with = "provider_or_none")]
    pub selected_provider: Option<Provider>,
    pub selected_model: Option<String>,
    pub shortcuts: ShortcutBindings,
}

/// A provider this build does not know reads as "not selected" instead of
/// failing the whole document.
fn provider_or_none<'de, D>(deserializer: D) -> Result<Option<Provider>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutAction {
    Capture,
    Undo,
    PromoteToNewContext,
    NewContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortcutBindings {
    pub capture: String,
    pub undo: String,
    pub promote_to_new_context: String,
    pub new_context: String,
}

impl Default for ShortcutBindings {
    fn default() -> Self {
        Self {
            capture: "cmd+shift+c".into(),
            undo: "cmd+shift+z".into(),
            promote_to_new_context: "cmd+shift+p".into(),
            new_context: "cmd+shift+n".into(),
        }
    }
}

impl ShortcutBindings {
    pub fn set(&mut self, action: ShortcutAction, binding: String) {
        match action {
            ShortcutAction::Capture => self.capture = binding,
            ShortcutAction::Undo => self.undo = binding,
            ShortcutAction::PromoteToNewContext => self.promote_to_new_context = binding,
            ShortcutAction::NewContext => self.new_context = binding,
        }
    }

    pub fn get(&self, action: ShortcutAction) -> &str {
        match action {
            ShortcutAction::Capture => &self.capture,
            ShortcutAction::Undo => &self.undo,
            ShortcutAction::PromoteToNewContext => &self.promote_to_new_context,
            ShortcutAction::NewContext => &self.new_context,
        }
    }
}
