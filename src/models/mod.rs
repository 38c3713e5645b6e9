//! Core data models for revtrail
//!
//! This module contains the data structures of the audit domain: records,
//! actors, per-field diffs, identifiers and reconstructed revisions.

pub mod action;
pub mod actor;
pub mod change;
pub mod ids;
pub mod record;
pub mod revision;

pub use action::Action;
pub use actor::ActorRef;
pub use change::{ChangeSet, ChangeValue};
pub use ids::{AuditId, EntityId, EntityRef, RequestId};
pub use record::{AuditRecord, NewAudit};
pub use revision::RevisionState;
