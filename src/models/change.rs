//! Per-field diffs as stored on an audit record
//!
//! A `ChangeSet` is an ordered map of field name to `ChangeValue`. The
//! serialized form is a JSON object whose values are either a two-element
//! `[old, new]` array or a bare value (fields set on create, with no prior
//! state). A bare value that is itself an array, or an object whose only key
//! is `$set`, is written as `{"$set": value}` so it cannot be mistaken for a
//! pair. Field order is preserved through a serialization round-trip.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Envelope key for bare values whose plain form would be ambiguous
pub const SET_ENVELOPE: &str = "$set";

/// The recorded change of one field
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeValue {
    /// Old and new value
    Changed(Value, Value),
    /// Bare value with no prior state
    Set(Value),
}

impl ChangeValue {
    pub fn changed(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self::Changed(old.into(), new.into())
    }

    pub fn set(value: impl Into<Value>) -> Self {
        Self::Set(value.into())
    }

    /// The value after the change
    pub fn new_value(&self) -> &Value {
        match self {
            ChangeValue::Changed(_, new) => new,
            ChangeValue::Set(value) => value,
        }
    }

    /// The value before the change; `Null` for bare values
    pub fn old_value(&self) -> &Value {
        match self {
            ChangeValue::Changed(old, _) => old,
            ChangeValue::Set(_) => &Value::Null,
        }
    }

    /// Both sides, old first; bare values yield only the new side
    pub fn sides(&self) -> impl Iterator<Item = &Value> {
        let (old, new) = match self {
            ChangeValue::Changed(old, new) => (Some(old), new),
            ChangeValue::Set(value) => (None, value),
        };
        old.into_iter().chain(std::iter::once(new))
    }

    /// Rebuild from the stored form
    pub fn from_stored(value: Value) -> Self {
        match value {
            Value::Array(mut items) if items.len() == 2 => {
                let new = items.pop().unwrap_or_default();
                let old = items.pop().unwrap_or_default();
                ChangeValue::Changed(old, new)
            }
            Value::Object(mut map) if map.len() == 1 && map.contains_key(SET_ENVELOPE) => {
                ChangeValue::Set(map.remove(SET_ENVELOPE).unwrap_or_default())
            }
            other => ChangeValue::Set(other),
        }
    }

    fn needs_envelope(value: &Value) -> bool {
        match value {
            Value::Array(_) => true,
            Value::Object(map) => map.len() == 1 && map.contains_key(SET_ENVELOPE),
            _ => false,
        }
    }
}

impl Serialize for ChangeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChangeValue::Changed(old, new) => (old, new).serialize(serializer),
            ChangeValue::Set(value) if Self::needs_envelope(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(SET_ENVELOPE, value)?;
                map.end()
            }
            ChangeValue::Set(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ChangeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ChangeValue::from_stored)
    }
}

/// Ordered field → change map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: Vec<(String, ChangeValue)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a change, replacing any earlier entry for the same field in place
    pub fn insert(&mut self, field: impl Into<String>, change: ChangeValue) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = change,
            None => self.entries.push((field, change)),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, change: ChangeValue) -> Self {
        self.insert(field, change);
        self
    }

    pub fn get(&self, field: &str) -> Option<&ChangeValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, change)| change)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeValue)> {
        self.entries.iter().map(|(name, change)| (name.as_str(), change))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ChangeValue)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, ChangeValue)>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for (field, change) in iter {
            set.insert(field, change);
        }
        set
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, ChangeValue);
    type IntoIter = std::vec::IntoIter<(String, ChangeValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, change) in &self.entries {
            map.serialize_entry(field, change)?;
        }
        map.end()
    }
}

struct ChangeSetVisitor;

impl<'de> Visitor<'de> for ChangeSetVisitor {
    type Value = ChangeSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of field name to change")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut set = ChangeSet::new();
        while let Some((field, change)) = access.next_entry::<String, ChangeValue>()? {
            set.insert(field, change);
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ChangeSetVisitor)
    }
}
