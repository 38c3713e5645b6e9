//! The entity framework the audit engine consults
//!
//! Tracked types are described by schemas (settable fields, relationships,
//! base type); live entities are fetched through an `EntitySource`.

pub mod instance;
pub mod schema;
pub mod source;

pub use instance::EntityInstance;
pub use schema::{EntitySchema, Relationship, TrackedTypes};
pub use source::{AuditBackedEntities, EntitySource, MemoryEntities};
