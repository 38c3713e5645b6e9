//! Record header: who did what to which kind of entity

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Action;

/// Verb shown for record-level changes that add or remove a child
pub const VERB_ADDED: &str = "Added";
pub const VERB_REMOVED: &str = "Removed";
pub const VERB_UPDATED: &str = "Updated";

/// Summary line of one audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub actor: String,
    pub verb: String,
    pub subject: Option<String>,
}

impl Header {
    /// Pick the verb for `action`
    ///
    /// Creates and destroys only read as "Added"/"Removed" when the record is
    /// a child of a parent or has a subject to name; otherwise "Updated".
    pub fn verb_for(action: Action, parent: bool, subject: Option<&str>) -> &'static str {
        let named = parent || subject.is_some_and(|s| !s.is_empty());
        match action {
            Action::Create if named => VERB_ADDED,
            Action::Destroy if named => VERB_REMOVED,
            _ => VERB_UPDATED,
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.actor, self.verb)?;
        if let Some(subject) = &self.subject {
            write!(f, " {}", subject)?;
        }
        Ok(())
    }
}
