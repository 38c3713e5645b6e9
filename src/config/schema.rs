//! Tracked-type schema file
//!
//! A YAML document listing every audited type:
//!
//! ```yaml
//! types:
//!   - name: Owner
//!     fields: [name]
//!   - name: Pet
//!     fields: [name, owner_id]
//!     relationships:
//!       - foreign_key: owner_id
//!     display:
//!       hide: [microchip]
//! ```

use serde::{Deserialize, Serialize};

use super::file_io::write_atomic;
use super::paths::TrailPaths;
use crate::entity::{EntitySchema, TrackedTypes};
use crate::error::{AuditError, AuditResult};

/// Contents of `schema.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub types: Vec<EntitySchema>,
}

impl SchemaConfig {
    /// Parse a schema document
    pub fn from_yaml(text: &str) -> AuditResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| AuditError::Config(format!("Failed to parse schema file: {}", e)))
    }

    /// Load the schema, or an empty one if the file doesn't exist
    pub fn load(paths: &TrailPaths) -> AuditResult<Self> {
        let path = paths.schema_file();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| AuditError::Io(format!("Failed to read schema file: {}", e)))?;
        Self::from_yaml(&contents)
    }

    pub fn save(&self, paths: &TrailPaths) -> AuditResult<()> {
        paths.ensure_directories()?;

        let contents = serde_yaml::to_string(self)
            .map_err(|e| AuditError::Config(format!("Failed to serialize schema: {}", e)))?;

        write_atomic(paths.schema_file(), contents.as_bytes())
    }

    /// Build the tracked-type registry; duplicate names are rejected
    pub fn into_registry(self) -> AuditResult<TrackedTypes> {
        TrackedTypes::from_schemas(self.types)
    }
}
