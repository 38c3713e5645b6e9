//! Reconstructed point-in-time state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute state of an entity as of one version
///
/// Derived by folding audit records; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisionState {
    pub attributes: Map<String, Value>,
    /// Latest version folded in; 0 when no record was found
    pub version: u32,
}

impl RevisionState {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.version == 0 && self.attributes.is_empty()
    }
}
