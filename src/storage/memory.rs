//! In-memory record store
//!
//! Used for tests and for embedding the engine in a process that persists
//! records elsewhere.

use std::sync::RwLock;

use crate::models::{AuditRecord, EntityId, EntityRef, RequestId};

use super::index::RecordIndex;
use super::{RecordStore, StoreError};

/// Record store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<RecordIndex>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&RecordIndex) -> T) -> Result<T, StoreError> {
        let data = self
            .data
            .read()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire read lock: {}", e)))?;
        Ok(f(&data))
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire write lock: {}", e)))?;

        data.check_unique(record)?;
        data.push(record.clone());
        Ok(())
    }

    fn query_by_entity(&self, entity: &EntityRef) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.by_entity(entity))
    }

    fn max_version(&self, entity: &EntityRef) -> Result<Option<u32>, StoreError> {
        self.read(|data| data.max_version(entity))
    }

    fn query_destroyed_referencing(
        &self,
        entity_type: Option<&str>,
        field: &str,
        id: &EntityId,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.destroyed_referencing(entity_type, field, id))
    }

    fn query_associated(&self, associated: &EntityRef) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.by_associated(associated))
    }

    fn query_by_request(&self, request: RequestId) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.by_request(request))
    }

    fn all(&self) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.all())
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.read(|data| data.len())
    }
}
