//! Per-call rendering configuration

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title override for the rendered header subject
///
/// The text `"none"` suppresses the subject entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisplayTitle {
    None,
    Text(String),
}

const NO_TITLE: &str = "none";

impl From<String> for DisplayTitle {
    fn from(title: String) -> Self {
        if title == NO_TITLE {
            Self::None
        } else {
            Self::Text(title)
        }
    }
}

impl From<&str> for DisplayTitle {
    fn from(title: &str) -> Self {
        Self::from(title.to_string())
    }
}

impl From<DisplayTitle> for String {
    fn from(title: DisplayTitle) -> Self {
        match title {
            DisplayTitle::None => NO_TITLE.to_string(),
            DisplayTitle::Text(text) => text,
        }
    }
}

/// Which fields to show and how
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMap {
    /// Fields never shown
    pub hide: BTreeSet<String>,

    /// Fields shown by name only, without values
    pub key_only: BTreeSet<String>,

    /// Per-field value → label tables
    pub mask: BTreeMap<String, BTreeMap<String, String>>,

    /// The record describes a child added to or removed from a parent
    pub parent: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<DisplayTitle>,
}

impl DisplayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(mut self, field: impl Into<String>) -> Self {
        self.hide.insert(field.into());
        self
    }

    pub fn key_only(mut self, field: impl Into<String>) -> Self {
        self.key_only.insert(field.into());
        self
    }

    /// Add a value → label table for `field`
    pub fn mask<K, L>(mut self, field: impl Into<String>, labels: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<Value>,
        L: Into<String>,
    {
        let table = self.mask.entry(field.into()).or_default();
        for (value, label) in labels {
            if let Some(key) = mask_key(&value.into()) {
                table.insert(key, label.into());
            }
        }
        self
    }

    pub fn parent(mut self, parent: bool) -> Self {
        self.parent = parent;
        self
    }

    pub fn title(mut self, title: impl Into<DisplayTitle>) -> Self {
        self.display_title = Some(title.into());
        self
    }

    /// Apply the field's mask to one value
    ///
    /// `None` when the field has no mask. Null stays null; values missing
    /// from the table pass through unchanged.
    pub fn apply_mask(&self, field: &str, value: &Value) -> Option<Value> {
        let table = self.mask.get(field)?;
        let masked = mask_key(value)
            .and_then(|key| table.get(&key))
            .map(|label| Value::String(label.clone()))
            .unwrap_or_else(|| value.clone());
        Some(masked)
    }
}

/// Table key for a raw value: its text form, or `None` for null and compounds
fn mask_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
