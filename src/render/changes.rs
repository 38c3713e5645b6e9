//! Display entries for individual field changes

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One rendered field change
///
/// Both values present: "changed from old to new". Only `new_value`: "set
/// to new". Neither: the field is shown by name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl ChangeEntry {
    pub fn key_only(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            old_value: None,
            new_value: None,
        }
    }

    /// Build the entry from display-ready values, or `None` if both are null
    pub fn from_values(subject: String, old: &Value, new: &Value) -> Option<Self> {
        let old_value = display_text(old);
        let new_value = display_text(new);
        if old_value.is_none() && new_value.is_none() {
            return None;
        }
        Some(Self {
            subject,
            old_value,
            new_value,
        })
    }

    /// Sentence form of the entry
    pub fn describe(&self) -> String {
        match (&self.old_value, &self.new_value) {
            (Some(old), Some(new)) => format!("{} changed from {} to {}", self.subject, old, new),
            (Some(old), None) => format!("{} cleared (was {})", self.subject, old),
            (None, Some(new)) => format!("{} set to {}", self.subject, new),
            (None, None) => self.subject.clone(),
        }
    }
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Empty strings count as absent
pub fn blank_to_null(value: Value) -> Value {
    match value {
        Value::String(s) if s.is_empty() => Value::Null,
        other => other,
    }
}

/// Text shown for a value; `None` for null
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
