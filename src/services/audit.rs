//! Audit service
//!
//! Creates audit records (validation, version assignment, actor attribution,
//! normalization) and answers the history queries built on top of the store.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::context;
use crate::entity::EntitySchema;
use crate::error::AuditResult;
use crate::inflect;
use crate::models::{Action, AuditRecord, EntityRef, NewAudit, RequestId};
use crate::storage::{StoreError, Storage};

use super::sequencer::VersionSequencer;

/// Service for recording and querying audit history
pub struct AuditService<'a> {
    pub(crate) storage: &'a Storage,
    version_retries: u32,
}

impl<'a> AuditService<'a> {
    /// Create a new audit service with default settings
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            version_retries: Settings::default().version_retries,
        }
    }

    /// Create a new audit service honoring user settings
    pub fn with_settings(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            version_retries: settings.version_retries,
        }
    }

    /// Record a change to a tracked entity
    ///
    /// When `new.actor` is unset the ambient actor context supplies it; the
    /// request id likewise falls back to the context, then to a fresh id.
    pub fn create(&self, new: NewAudit) -> AuditResult<AuditRecord> {
        new.validate()?;

        let actor = new.actor.clone().or_else(context::current_actor);
        let request = new
            .request_uuid
            .or_else(context::current_request)
            .unwrap_or_else(RequestId::new);
        let record = AuditRecord::from_new(new, 0, actor, request);

        self.storage
            .sequencer()
            .with_key_lock(&record.auditable.clone(), || self.insert_next(record))?
    }

    /// Assign the next version and insert, retrying lost races
    fn insert_next(&self, mut record: AuditRecord) -> AuditResult<AuditRecord> {
        let store = self.storage.records();
        let mut attempt = 0;

        loop {
            record.version = VersionSequencer::next_version(store, &record.auditable)?;

            match store.insert(&record) {
                Ok(()) => {
                    debug!(
                        entity = %record.auditable,
                        version = record.version,
                        action = %record.action,
                        "recorded audit"
                    );
                    return Ok(record);
                }
                Err(err @ StoreError::Conflict { .. }) if attempt < self.version_retries => {
                    attempt += 1;
                    warn!(error = %err, attempt, "version conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Every record of one entity, ascending by version
    pub fn find_all_for_entity(&self, key: &EntityRef) -> AuditResult<Vec<AuditRecord>> {
        Ok(self.storage.records().query_by_entity(key)?)
    }

    /// Records of the same entity up to and including `record`'s version
    pub fn find_ancestors(&self, record: &AuditRecord) -> AuditResult<Vec<AuditRecord>> {
        let mut records = self.find_all_for_entity(&record.auditable)?;
        records.retain(|r| r.version <= record.version);
        Ok(records)
    }

    /// Full histories of destroyed entities that referenced `owner`
    ///
    /// Searches under the owner's conventional foreign key and, when the owner
    /// or child type inherits from a base type, under the base type's key and
    /// base child type as well. Histories are returned per entity in order of
    /// first match.
    pub fn find_deleted_associations(
        &self,
        owner: &EntityRef,
        child_type: Option<&str>,
    ) -> AuditResult<Vec<AuditRecord>> {
        let types = self.storage.types();

        let mut keys = vec![inflect::foreign_key(&owner.entity_type)];
        if let Some(base) = types.base_type(&owner.entity_type) {
            let key = inflect::foreign_key(&base);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut child_types: Vec<Option<String>> = vec![child_type.map(str::to_string)];
        if let Some(base) = child_type.and_then(|child| types.base_type(child)) {
            if child_type != Some(base.as_str()) {
                child_types.push(Some(base));
            }
        }

        let mut matched: Vec<EntityRef> = Vec::new();
        let mut seen = HashSet::new();
        for child in &child_types {
            for key in &keys {
                let destroyed = self.storage.records().query_destroyed_referencing(
                    child.as_deref(),
                    key,
                    &owner.id,
                )?;
                for record in destroyed {
                    if seen.insert(record.auditable.clone()) {
                        matched.push(record.auditable);
                    }
                }
            }
        }

        debug!(owner = %owner, matches = matched.len(), "deleted association lookup");

        let mut history = Vec::new();
        for entity in &matched {
            history.extend(self.find_all_for_entity(entity)?);
        }
        Ok(history)
    }

    /// Schemas of every audited type
    pub fn audited_type_names(&self) -> Vec<Arc<EntitySchema>> {
        self.storage.types().schemas()
    }

    /// Records with `from <= version <= to`, ascending
    pub fn find_by_version_range(
        &self,
        key: &EntityRef,
        from: u32,
        to: u32,
    ) -> AuditResult<Vec<AuditRecord>> {
        let mut records = self.find_all_for_entity(key)?;
        records.retain(|r| (from..=to).contains(&r.version));
        Ok(records)
    }

    pub fn find_by_action(&self, key: &EntityRef, action: Action) -> AuditResult<Vec<AuditRecord>> {
        let mut records = self.find_all_for_entity(key)?;
        records.retain(|r| r.action == action);
        Ok(records)
    }

    /// The entity's own records plus records naming it as associated, oldest first
    pub fn find_associated(&self, entity: &EntityRef) -> AuditResult<Vec<AuditRecord>> {
        let mut records = self.find_all_for_entity(entity)?;
        records.extend(self.storage.records().query_associated(entity)?);
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    pub fn find_by_request(&self, request: RequestId) -> AuditResult<Vec<AuditRecord>> {
        Ok(self.storage.records().query_by_request(request)?)
    }

    pub fn latest_for_entity(&self, key: &EntityRef) -> AuditResult<Option<AuditRecord>> {
        Ok(self.find_all_for_entity(key)?.pop())
    }
}
