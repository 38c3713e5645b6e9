//! revtrail - Versioned audit trail for arbitrary entities
//!
//! This library records every create, update and destroy of a tracked entity
//! as an immutable, versioned audit record. From that history it can rebuild
//! the entity as of any version or point in time, find destroyed children of
//! an owner, and render each record as human-readable change text.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration, schema file and path management
//! - `error`: Custom error types
//! - `models`: Audit records, entity references, actions and change sets
//! - `codec`: Change normalization and the stored text form
//! - `context`: Ambient actor and request for the current thread
//! - `entity`: Tracked type registry and live entity lookup
//! - `storage`: Record stores (in-memory and JSON lines)
//! - `services`: Recording, history queries and revision reconstruction
//! - `render`: Turning records into headers and change descriptions
//! - `display`: Terminal tables
//! - `export`: CSV, JSON and YAML export
//!
//! # Example
//!
//! ```rust,ignore
//! use revtrail::codec::RawChanges;
//! use revtrail::entity::TrackedTypes;
//! use revtrail::models::{EntityRef, NewAudit};
//! use revtrail::services::AuditService;
//! use revtrail::storage::Storage;
//!
//! let storage = Storage::in_memory(TrackedTypes::new());
//! let service = AuditService::new(&storage);
//! let pet = EntityRef::new("Pet", 1);
//! service.create(NewAudit::create(pet.clone(), RawChanges::new().set("name", "Rex")))?;
//! let state = service.reconstruct(&pet, 1)?;
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod context;
pub mod display;
pub mod entity;
pub mod error;
pub mod export;
pub mod inflect;
pub mod models;
pub mod render;
pub mod services;
pub mod storage;

pub use error::{AuditError, AuditResult};
