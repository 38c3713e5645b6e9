//! Loose in-memory representation of a tracked entity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{EntityId, EntityRef};

/// Attribute names tried, in order, for a display label
pub const DISPLAY_NAME_FIELDS: [&str; 4] = ["full_name", "name", "value", "title"];

/// An entity instance: live, resurrected from history, or freshly built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInstance {
    pub entity_type: String,
    pub id: Option<EntityId>,
    pub attributes: Map<String, Value>,
    /// Audit version this instance reflects
    pub version: Option<u32>,
    /// False for instances that do not (or no longer) exist in the live store
    pub persisted: bool,
}

impl EntityInstance {
    /// A fresh, unsaved instance
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: None,
            attributes: Map::new(),
            version: None,
            persisted: false,
        }
    }

    /// A persisted instance with the given attributes
    pub fn persisted(key: &EntityRef, attributes: Map<String, Value>) -> Self {
        Self {
            entity_type: key.entity_type.clone(),
            id: Some(key.id.clone()),
            attributes,
            version: None,
            persisted: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(field, value);
        self
    }

    pub fn set_attribute(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn set_version(&mut self, version: u32) {
        self.version = Some(version);
    }

    pub fn is_new_record(&self) -> bool {
        !self.persisted
    }

    pub fn key(&self) -> Option<EntityRef> {
        self.id
            .as_ref()
            .map(|id| EntityRef::new(self.entity_type.clone(), id.clone()))
    }

    /// First non-empty of `full_name`, `name`, `value`, `title`
    pub fn display_name(&self) -> Option<String> {
        DISPLAY_NAME_FIELDS
            .iter()
            .find_map(|field| self.text(field))
    }

    /// `"{first_name} {last_name}"`, skipping whichever half is missing
    pub fn person_name(&self) -> Option<String> {
        let parts: Vec<String> = ["first_name", "last_name"]
            .iter()
            .filter_map(|field| self.text(field))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn text(&self, field: &str) -> Option<String> {
        match self.attributes.get(field)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
