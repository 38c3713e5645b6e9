//! In-memory index shared by the record stores
//!
//! Keeps records in insertion order plus lookup tables by entity, by
//! associated entity, by request, and by foreign-key reference. The reference
//! table answers "which records mention entity X under field F" without
//! pattern-matching serialized diffs.

use std::collections::HashMap;

use crate::inflect;
use crate::models::{Action, AuditRecord, EntityId, EntityRef, RequestId};

use super::StoreError;

/// `(field, id)` pairs for every foreign-key value a record's diff mentions
pub fn foreign_key_references(record: &AuditRecord) -> Vec<(String, EntityId)> {
    let mut refs = Vec::new();
    for (field, change) in record.changes.iter() {
        if !inflect::is_foreign_key(field) {
            continue;
        }
        for value in change.sides() {
            if let Some(id) = EntityId::from_value(value) {
                let pair = (field.to_string(), id);
                if !refs.contains(&pair) {
                    refs.push(pair);
                }
            }
        }
    }
    refs
}

#[derive(Debug, Default)]
pub(crate) struct RecordIndex {
    records: Vec<AuditRecord>,
    /// Positions per entity, ascending by version
    by_entity: HashMap<EntityRef, Vec<usize>>,
    by_associated: HashMap<EntityRef, Vec<usize>>,
    by_request: HashMap<RequestId, Vec<usize>>,
    references: HashMap<(String, EntityId), Vec<usize>>,
}

impl RecordIndex {
    /// Fail with `Conflict` if the record's version is already taken
    pub fn check_unique(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let taken = self
            .by_entity
            .get(&record.auditable)
            .is_some_and(|positions| {
                positions
                    .iter()
                    .any(|&i| self.records[i].version == record.version)
            });

        if taken {
            return Err(StoreError::Conflict {
                entity: record.auditable.clone(),
                version: record.version,
            });
        }
        Ok(())
    }

    pub fn push(&mut self, record: AuditRecord) {
        let position = self.records.len();

        let versions = self.by_entity.entry(record.auditable.clone()).or_default();
        let at = versions
            .iter()
            .position(|&i| self.records[i].version > record.version)
            .unwrap_or(versions.len());
        versions.insert(at, position);

        if let Some(associated) = &record.associated {
            self.by_associated
                .entry(associated.clone())
                .or_default()
                .push(position);
        }

        self.by_request
            .entry(record.request_uuid)
            .or_default()
            .push(position);

        for key in foreign_key_references(&record) {
            self.references.entry(key).or_default().push(position);
        }

        self.records.push(record);
    }

    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<AuditRecord> {
        positions
            .map(|positions| positions.iter().map(|&i| self.records[i].clone()).collect())
            .unwrap_or_default()
    }

    pub fn by_entity(&self, entity: &EntityRef) -> Vec<AuditRecord> {
        self.collect(self.by_entity.get(entity))
    }

    pub fn max_version(&self, entity: &EntityRef) -> Option<u32> {
        self.by_entity
            .get(entity)
            .and_then(|positions| positions.last())
            .map(|&i| self.records[i].version)
    }

    pub fn by_associated(&self, associated: &EntityRef) -> Vec<AuditRecord> {
        self.collect(self.by_associated.get(associated))
    }

    pub fn by_request(&self, request: RequestId) -> Vec<AuditRecord> {
        self.collect(self.by_request.get(&request))
    }

    pub fn destroyed_referencing(
        &self,
        entity_type: Option<&str>,
        field: &str,
        id: &EntityId,
    ) -> Vec<AuditRecord> {
        let key = (field.to_string(), id.clone());
        self.references
            .get(&key)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| &self.records[i])
                    .filter(|r| r.action == Action::Destroy)
                    .filter(|r| entity_type.map_or(true, |t| r.auditable.entity_type == t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<AuditRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RawChanges, RawValue};
    use crate::models::{NewAudit, RequestId};

    fn record(entity: EntityRef, action: Action, version: u32, changes: RawChanges) -> AuditRecord {
        let new = NewAudit::new(entity, action).with_changes(changes);
        AuditRecord::from_new(new, version, None, RequestId::new())
    }

    #[test]
    fn test_references_extracted_from_both_sides() {
        let r = record(
            EntityRef::new("Child", 1),
            Action::Update,
            2,
            RawChanges::new()
                .changed("owner_id", 3, 7)
                .set("name", "x")
                .changed("parent_id", RawValue::null(), "abc"),
        );
        let refs = foreign_key_references(&r);
        assert_eq!(
            refs,
            vec![
                ("owner_id".to_string(), EntityId::from(3)),
                ("owner_id".to_string(), EntityId::from(7)),
                ("parent_id".to_string(), EntityId::from("abc")),
            ]
        );
    }

    #[test]
    fn test_versions_kept_sorted() {
        let mut index = RecordIndex::default();
        let key = EntityRef::new("Widget", 1);
        for version in [2, 1, 3] {
            index.push(record(key.clone(), Action::Update, version, RawChanges::new()));
        }
        let versions: Vec<_> = index.by_entity(&key).iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(index.max_version(&key), Some(3));
    }

    #[test]
    fn test_check_unique() {
        let mut index = RecordIndex::default();
        let key = EntityRef::new("Widget", 1);
        index.push(record(key.clone(), Action::Create, 1, RawChanges::new()));

        let dup = record(key.clone(), Action::Update, 1, RawChanges::new());
        assert!(matches!(index.check_unique(&dup), Err(StoreError::Conflict { .. })));

        let next = record(key, Action::Update, 2, RawChanges::new());
        assert!(index.check_unique(&next).is_ok());
    }

    #[test]
    fn test_destroyed_referencing_filters_action_and_type() {
        let mut index = RecordIndex::default();
        let changes = || RawChanges::new().changed("owner_id", 7, RawValue::null());
        index.push(record(EntityRef::new("Child", 1), Action::Update, 1, changes()));
        index.push(record(EntityRef::new("Child", 1), Action::Destroy, 2, changes()));
        index.push(record(EntityRef::new("Pet", 9), Action::Destroy, 1, changes()));

        let owner = EntityId::from(7);
        assert_eq!(index.destroyed_referencing(Some("Child"), "owner_id", &owner).len(), 1);
        assert_eq!(index.destroyed_referencing(None, "owner_id", &owner).len(), 2);
        assert!(index.destroyed_referencing(None, "owner_id", &EntityId::from(8)).is_empty());
    }
}
