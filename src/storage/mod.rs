//! Storage layer for revtrail
//!
//! Audit records go through the `RecordStore` trait: insert with a uniqueness
//! constraint on `(entity_type, id, version)` plus the handful of queries the
//! services need. Stores never update or delete a record once inserted.

mod index;
pub mod jsonl;
mod lock;
pub mod memory;

pub use index::foreign_key_references;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use thiserror::Error;

use crate::config::paths::TrailPaths;
use crate::entity::TrackedTypes;
use crate::error::AuditResult;
use crate::models::{AuditRecord, EntityId, EntityRef, RequestId};
use crate::services::sequencer::VersionSequencer;

/// Failures reported by a record store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The unique constraint on entity + version rejected the insert
    #[error("version {version} already recorded for {entity}")]
    Conflict { entity: EntityRef, version: u32 },

    /// The backend itself failed
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Durable, append-only home of audit records
pub trait RecordStore: Send + Sync {
    /// Persist a record; fails with `Conflict` if its version is taken
    fn insert(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// All records of one entity, ascending by version
    fn query_by_entity(&self, entity: &EntityRef) -> Result<Vec<AuditRecord>, StoreError>;

    /// Highest version recorded for the entity
    fn max_version(&self, entity: &EntityRef) -> Result<Option<u32>, StoreError>;

    /// Destroy records whose diff references `id` under `field`,
    /// optionally restricted to one auditable type
    fn query_destroyed_referencing(
        &self,
        entity_type: Option<&str>,
        field: &str,
        id: &EntityId,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    /// Records whose associated entity is `associated`, in insertion order
    fn query_associated(&self, associated: &EntityRef) -> Result<Vec<AuditRecord>, StoreError>;

    /// Records written under one request, in insertion order
    fn query_by_request(&self, request: RequestId) -> Result<Vec<AuditRecord>, StoreError>;

    /// Every record, in insertion order
    fn all(&self) -> Result<Vec<AuditRecord>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

/// Main storage coordinator: the record store, the tracked-type registry and
/// the per-entity version sequencer
pub struct Storage {
    records: Box<dyn RecordStore>,
    types: TrackedTypes,
    sequencer: VersionSequencer,
}

impl Storage {
    /// Wrap an arbitrary record store
    pub fn with_store(records: Box<dyn RecordStore>, types: TrackedTypes) -> Self {
        Self {
            records,
            types,
            sequencer: VersionSequencer::new(),
        }
    }

    /// Storage that lives only as long as the process
    pub fn in_memory(types: TrackedTypes) -> Self {
        Self::with_store(Box::new(MemoryStore::new()), types)
    }

    /// Open the JSONL audit log under `paths`, creating directories as needed
    pub fn open(paths: &TrailPaths, types: TrackedTypes) -> AuditResult<Self> {
        paths.ensure_directories()?;
        let store = JsonlStore::open(paths.audit_log())?;
        Ok(Self::with_store(Box::new(store), types))
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn types(&self) -> &TrackedTypes {
        &self.types
    }

    pub fn sequencer(&self) -> &VersionSequencer {
        &self.sequencer
    }
}
