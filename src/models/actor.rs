//! Who made a change

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::EntityRef;

/// Attribution of an audited change
///
/// Either a free-text name (scripts, background jobs, imports) or a
/// reference to the entity representing a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRef {
    Named(String),
    Entity(EntityRef),
}

impl ActorRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn entity(reference: EntityRef) -> Self {
        Self::Entity(reference)
    }

    /// Split into the two persisted columns; at most one is populated
    pub fn into_columns(actor: Option<Self>) -> (Option<String>, Option<EntityRef>) {
        match actor {
            Some(Self::Named(name)) => (Some(name), None),
            Some(Self::Entity(reference)) => (None, Some(reference)),
            None => (None, None),
        }
    }

    /// Rebuild from the two persisted columns
    ///
    /// Returns `Err` when both are populated.
    pub fn from_columns(
        username: Option<String>,
        user: Option<EntityRef>,
    ) -> Result<Option<Self>, String> {
        match (username, user) {
            (Some(name), None) => Ok(Some(Self::Named(name))),
            (None, Some(reference)) => Ok(Some(Self::Entity(reference))),
            (None, None) => Ok(None),
            (Some(name), Some(reference)) => Err(format!(
                "actor has both a name ('{}') and a user ({})",
                name, reference
            )),
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRef::Named(name) => f.write_str(name),
            ActorRef::Entity(reference) => write!(f, "{}", reference),
        }
    }
}
