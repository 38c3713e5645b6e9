//! Lookup of live entities

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{AuditError, AuditResult};
use crate::models::{Action, EntityRef};
use crate::services::revision::fold;
use crate::storage::Storage;

use super::EntityInstance;

/// Fetches the current state of an entity by type and id
pub trait EntitySource: Send + Sync {
    /// `Ok(None)` when the entity does not exist (or no longer exists)
    fn find(&self, key: &EntityRef) -> AuditResult<Option<EntityInstance>>;
}

/// Entity source backed by a map, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryEntities {
    entities: RwLock<HashMap<EntityRef, EntityInstance>>,
}

impl MemoryEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity; the instance must carry an id
    pub fn insert(&self, mut instance: EntityInstance) -> AuditResult<()> {
        let key = instance
            .key()
            .ok_or_else(|| AuditError::Validation("Entity instance has no id".into()))?;
        instance.persisted = true;

        let mut entities = self
            .entities
            .write()
            .map_err(|e| AuditError::Persistence(format!("Failed to acquire write lock: {}", e)))?;
        entities.insert(key, instance);
        Ok(())
    }

    pub fn remove(&self, key: &EntityRef) -> AuditResult<Option<EntityInstance>> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| AuditError::Persistence(format!("Failed to acquire write lock: {}", e)))?;
        Ok(entities.remove(key))
    }
}

impl EntitySource for MemoryEntities {
    fn find(&self, key: &EntityRef) -> AuditResult<Option<EntityInstance>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| AuditError::Persistence(format!("Failed to acquire read lock: {}", e)))?;
        Ok(entities.get(key).cloned())
    }
}

/// Entity source that treats the audit log itself as the live store
///
/// An entity exists while its history is non-empty and does not end in a
/// destroy; its state is the fold of every recorded change.
pub struct AuditBackedEntities<'a> {
    storage: &'a Storage,
}

impl<'a> AuditBackedEntities<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

impl EntitySource for AuditBackedEntities<'_> {
    fn find(&self, key: &EntityRef) -> AuditResult<Option<EntityInstance>> {
        let records = self.storage.records().query_by_entity(key)?;

        match records.last() {
            None => Ok(None),
            Some(last) if last.action == Action::Destroy => Ok(None),
            Some(_) => {
                let state = fold(&records);
                let mut instance = EntityInstance::persisted(key, state.attributes);
                instance.set_version(state.version);
                Ok(Some(instance))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawChanges;
    use crate::entity::TrackedTypes;
    use crate::models::NewAudit;
    use crate::services::AuditService;

    #[test]
    fn test_memory_entities() {
        let entities = MemoryEntities::new();
        let key = EntityRef::new("Owner", 1);
        entities
            .insert(EntityInstance::new("Owner").with_id(1).with_attribute("name", "Alice"))
            .unwrap();

        let found = entities.find(&key).unwrap().unwrap();
        assert!(!found.is_new_record());
        assert_eq!(found.display_name().as_deref(), Some("Alice"));

        entities.remove(&key).unwrap();
        assert!(entities.find(&key).unwrap().is_none());
    }

    #[test]
    fn test_insert_without_id_rejected() {
        let entities = MemoryEntities::new();
        let err = entities.insert(EntityInstance::new("Owner")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_audit_backed_lifecycle() {
        let storage = Storage::in_memory(TrackedTypes::new());
        let service = AuditService::new(&storage);
        let key = EntityRef::new("Owner", 5);
        let source = AuditBackedEntities::new(&storage);

        assert!(source.find(&key).unwrap().is_none());

        service
            .create(NewAudit::create(key.clone(), RawChanges::new().set("name", "Bob")))
            .unwrap();
        service
            .create(NewAudit::update(
                key.clone(),
                RawChanges::new().changed("name", "Bob", "Robert"),
            ))
            .unwrap();

        let live = source.find(&key).unwrap().unwrap();
        assert_eq!(live.display_name().as_deref(), Some("Robert"));
        assert_eq!(live.version, Some(2));

        service
            .create(NewAudit::destroy(
                key.clone(),
                RawChanges::new().changed("name", "Robert", serde_json::Value::Null),
            ))
            .unwrap();
        assert!(source.find(&key).unwrap().is_none());
    }
}
