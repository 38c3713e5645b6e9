//! Tracked entity schemas and the process-wide registry of audited types

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::inflect;
use crate::render::DisplayMap;

/// A foreign-key relationship declared on an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Field holding the related id, e.g. `owner_id`
    pub foreign_key: String,

    /// Related type; defaults to the camelized field name without `_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// The related type is stored alongside the id and cannot be inferred
    #[serde(default)]
    pub polymorphic: bool,
}

impl Relationship {
    pub fn belongs_to(foreign_key: impl Into<String>) -> Self {
        Self {
            foreign_key: foreign_key.into(),
            target: None,
            polymorphic: false,
        }
    }

    pub fn polymorphic(foreign_key: impl Into<String>) -> Self {
        Self {
            polymorphic: true,
            ..Self::belongs_to(foreign_key)
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Type name of the related entity
    pub fn target_type(&self) -> String {
        self.target
            .clone()
            .unwrap_or_else(|| inflect::foreign_key_target(&self.foreign_key))
    }
}

/// Description of one audited entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,

    /// Base type when this type shares a table with its parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Settable attributes; empty means every attribute is accepted
    #[serde(default)]
    pub fields: Vec<String>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    /// Default rendering configuration for records of this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayMap>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            relationships: Vec::new(),
            display: None,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_display(mut self, display: DisplayMap) -> Self {
        self.display = Some(display);
        self
    }

    /// Whether `field` may be set on an instance of this type
    pub fn accepts(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.iter().any(|f| f == field)
    }

    pub fn relationship_for(&self, foreign_key: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.foreign_key == foreign_key)
    }
}

/// Registry of audited entity types
///
/// Types are registered during setup and never removed.
#[derive(Debug, Default)]
pub struct TrackedTypes {
    schemas: RwLock<BTreeMap<String, Arc<EntitySchema>>>,
}

impl TrackedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of schemas
    pub fn from_schemas(schemas: impl IntoIterator<Item = EntitySchema>) -> AuditResult<Self> {
        let types = Self::new();
        for schema in schemas {
            types.register(schema)?;
        }
        Ok(types)
    }

    /// Add a type to the registry
    pub fn register(&self, schema: EntitySchema) -> AuditResult<Arc<EntitySchema>> {
        if schema.name.trim().is_empty() {
            return Err(AuditError::Config("Tracked type needs a name".into()));
        }

        let mut schemas = self
            .schemas
            .write()
            .map_err(|e| AuditError::Config(format!("Failed to acquire write lock: {}", e)))?;

        if schemas.contains_key(&schema.name) {
            return Err(AuditError::Config(format!(
                "Type '{}' is already tracked",
                schema.name
            )));
        }

        let schema = Arc::new(schema);
        schemas.insert(schema.name.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Look up the schema for a type name
    pub fn resolve(&self, name: &str) -> Option<Arc<EntitySchema>> {
        self.schemas
            .read()
            .ok()
            .and_then(|schemas| schemas.get(name).cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<String> {
        self.schemas
            .read()
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All registered schemas, sorted by name
    pub fn schemas(&self) -> Vec<Arc<EntitySchema>> {
        self.schemas
            .read()
            .map(|schemas| schemas.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Base type name when `name` participates in single-table inheritance
    pub fn base_type(&self, name: &str) -> Option<String> {
        self.resolve(name).and_then(|schema| schema.base.clone())
    }

    /// Relationship metadata for a foreign key, searching the base type too
    pub fn relationship(&self, name: &str, foreign_key: &str) -> Option<Relationship> {
        let schema = self.resolve(name)?;
        if let Some(relationship) = schema.relationship_for(foreign_key) {
            return Some(relationship.clone());
        }
        schema
            .base
            .as_deref()
            .filter(|base| *base != name)
            .and_then(|base| self.resolve(base))
            .and_then(|base| base.relationship_for(foreign_key).cloned())
    }

    /// Display configuration registered for a type, if any
    pub fn display_map(&self, name: &str) -> Option<DisplayMap> {
        self.resolve(name).and_then(|schema| schema.display.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TrackedTypes {
        TrackedTypes::from_schemas([
            EntitySchema::new("Owner").with_fields(["name"]),
            EntitySchema::new("Vehicle")
                .with_relationship(Relationship::belongs_to("owner_id"))
                .with_relationship(Relationship::polymorphic("subject_id")),
            EntitySchema::new("Car").with_base("Vehicle"),
        ])
        .unwrap()
    }

    #[test]
    fn test_register_and_resolve() {
        let types = registry();
        assert_eq!(types.names(), vec!["Car", "Owner", "Vehicle"]);
        assert!(types.contains("Owner"));
        assert!(types.resolve("Missing").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let types = registry();
        let err = types.register(EntitySchema::new("Owner")).unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
        assert_eq!(types.names().len(), 3);
    }

    #[test]
    fn test_accepts() {
        let owner = EntitySchema::new("Owner").with_fields(["name"]);
        assert!(owner.accepts("name"));
        assert!(!owner.accepts("password"));
        assert!(EntitySchema::new("Open").accepts("anything"));
    }

    #[test]
    fn test_relationship_inherited_from_base() {
        let types = registry();
        assert_eq!(types.base_type("Car").as_deref(), Some("Vehicle"));
        let rel = types.relationship("Car", "owner_id").unwrap();
        assert_eq!(rel.target_type(), "Owner");
        assert!(types.relationship("Car", "subject_id").unwrap().polymorphic);
        assert!(types.relationship("Owner", "owner_id").is_none());
    }

    #[test]
    fn test_explicit_target() {
        let rel = Relationship::belongs_to("author_id").with_target("Person");
        assert_eq!(rel.target_type(), "Person");
    }
}
