//! Revision reconstruction
//!
//! A revision is the fold of every recorded change of an entity up to a
//! target version: each record's new values overwrite the running attribute
//! map. Folding never fails; only the store read behind it can.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::entity::{EntityInstance, EntitySource};
use crate::error::{AuditError, AuditResult};
use crate::models::{AuditRecord, EntityRef, RevisionState};

use super::audit::AuditService;

/// Fold records (ascending by version) into the state after the last one
pub fn fold(records: &[AuditRecord]) -> RevisionState {
    records
        .iter()
        .fold(RevisionState::default(), |mut state, record| {
            state.attributes.extend(record.new_attributes());
            state.version = state.version.max(record.version);
            state
        })
}

impl AuditService<'_> {
    fn history_for_reconstruction(&self, key: &EntityRef) -> AuditResult<Vec<AuditRecord>> {
        self.storage
            .records()
            .query_by_entity(key)
            .map_err(|e| AuditError::Reconstruction(e.to_string()))
    }

    /// Attribute state of `key` as of `target_version`
    ///
    /// Version 0, or an entity without history, yields an empty state.
    pub fn reconstruct(&self, key: &EntityRef, target_version: u32) -> AuditResult<RevisionState> {
        let mut records = self.history_for_reconstruction(key)?;
        records.retain(|r| r.version <= target_version);

        let state = fold(&records);
        debug!(entity = %key, target_version, version = state.version, "reconstructed revision");
        Ok(state)
    }

    /// Every successive state of `key`, one per recorded version
    pub fn revisions(&self, key: &EntityRef) -> AuditResult<Vec<RevisionState>> {
        let records = self.history_for_reconstruction(key)?;

        let mut state = RevisionState::default();
        let mut revisions = Vec::with_capacity(records.len());
        for record in &records {
            state.attributes.extend(record.new_attributes());
            state.version = record.version;
            revisions.push(state.clone());
        }
        Ok(revisions)
    }

    /// State of `key` as of `at`; `None` if nothing was recorded by then
    pub fn revision_at(
        &self,
        key: &EntityRef,
        at: DateTime<Utc>,
    ) -> AuditResult<Option<RevisionState>> {
        let mut records = self.history_for_reconstruction(key)?;
        records.retain(|r| r.created_at <= at);

        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(fold(&records)))
    }

    /// Turn a revision into an entity instance
    ///
    /// Starts from the live entity when `source` still has it, else from a
    /// fresh unsaved instance; attributes the type does not accept are
    /// skipped. An empty state yields a blank fresh instance.
    pub fn materialize(
        &self,
        state: &RevisionState,
        key: &EntityRef,
        source: &dyn EntitySource,
    ) -> AuditResult<EntityInstance> {
        let schema = self
            .storage
            .types()
            .resolve(&key.entity_type)
            .ok_or_else(|| AuditError::not_found("Tracked type", key.entity_type.clone()))?;

        if state.is_empty() {
            return Ok(EntityInstance::new(schema.name.clone()).with_id(key.id.clone()));
        }

        let mut instance = match source.find(key)? {
            Some(live) => live,
            None => EntityInstance::new(schema.name.clone()).with_id(key.id.clone()),
        };

        for (field, value) in &state.attributes {
            if schema.accepts(field) {
                instance.set_attribute(field.clone(), value.clone());
            }
        }
        instance.set_version(state.version);

        Ok(instance)
    }
}
