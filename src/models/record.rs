//! Audit record data structures
//!
//! `AuditRecord` is the immutable, persisted row. `NewAudit` is what callers
//! hand to the service; version, actor fallback and normalization are applied
//! when it is turned into a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::Action;
use super::actor::ActorRef;
use super::change::ChangeSet;
use super::ids::{AuditId, EntityId, EntityRef, RequestId};
use crate::codec::{self, RawChanges};
use crate::error::{AuditError, AuditResult};

/// One audited change of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RecordColumns", try_from = "RecordColumns")]
pub struct AuditRecord {
    pub id: AuditId,

    /// The tracked entity
    pub auditable: EntityRef,

    /// Optional secondary entity the change belongs to
    pub associated: Option<EntityRef>,

    /// Who made the change
    pub actor: Option<ActorRef>,

    pub action: Action,

    /// Normalized per-field diff
    pub changes: ChangeSet,

    pub comment: Option<String>,

    /// Position in the entity's history, starting at 1
    pub version: u32,

    /// Correlates records written by one logical request
    pub request_uuid: RequestId,

    pub remote_address: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build the record to persist from caller input
    ///
    /// Normalizes the captured changes; `actor` and `request_uuid` have already
    /// been resolved against the ambient context by the caller.
    pub fn from_new(
        new: NewAudit,
        version: u32,
        actor: Option<ActorRef>,
        request_uuid: RequestId,
    ) -> Self {
        Self {
            id: AuditId::new(),
            auditable: new.auditable,
            associated: new.associated,
            actor,
            action: new.action,
            changes: codec::normalize_for_storage(new.changes),
            comment: new.comment,
            version,
            request_uuid,
            remote_address: new.remote_address,
            created_at: Utc::now(),
        }
    }

    /// Attribute values after this change
    pub fn new_attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        codec::new_attributes(self)
    }

    /// Attribute values before this change
    pub fn old_attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        codec::old_attributes(self)
    }

    /// Format the record for one-line human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] v{} {} {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.version,
            self.action,
            self.auditable
        );

        if let Some(actor) = &self.actor {
            output.push_str(&format!(" by {}", actor));
        }

        if let Some(comment) = &self.comment {
            output.push_str(&format!(" ({})", comment));
        }

        output
    }
}

/// Flat persisted layout: polymorphic references and the actor become
/// nullable columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordColumns {
    id: AuditId,
    auditable_type: String,
    auditable_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    associated_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    associated_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    action: Action,
    audited_changes: ChangeSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    version: u32,
    request_uuid: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_address: Option<String>,
    created_at: DateTime<Utc>,
}

fn join_ref(entity_type: Option<String>, id: Option<EntityId>) -> Result<Option<EntityRef>, String> {
    match (entity_type, id) {
        (Some(entity_type), Some(id)) => Ok(Some(EntityRef { entity_type, id })),
        (None, None) => Ok(None),
        (entity_type, id) => Err(format!(
            "incomplete polymorphic reference: type={:?} id={:?}",
            entity_type, id
        )),
    }
}

impl From<AuditRecord> for RecordColumns {
    fn from(record: AuditRecord) -> Self {
        let (username, user) = ActorRef::into_columns(record.actor);
        let (user_type, user_id) = match user {
            Some(reference) => (Some(reference.entity_type), Some(reference.id)),
            None => (None, None),
        };
        let (associated_type, associated_id) = match record.associated {
            Some(reference) => (Some(reference.entity_type), Some(reference.id)),
            None => (None, None),
        };

        Self {
            id: record.id,
            auditable_type: record.auditable.entity_type,
            auditable_id: record.auditable.id,
            associated_type,
            associated_id,
            user_type,
            user_id,
            username,
            action: record.action,
            audited_changes: record.changes,
            comment: record.comment,
            version: record.version,
            request_uuid: record.request_uuid,
            remote_address: record.remote_address,
            created_at: record.created_at,
        }
    }
}

impl TryFrom<RecordColumns> for AuditRecord {
    type Error = String;

    fn try_from(columns: RecordColumns) -> Result<Self, Self::Error> {
        let user = join_ref(columns.user_type, columns.user_id)?;
        let actor = ActorRef::from_columns(columns.username, user)?;
        let associated = join_ref(columns.associated_type, columns.associated_id)?;

        Ok(Self {
            id: columns.id,
            auditable: EntityRef {
                entity_type: columns.auditable_type,
                id: columns.auditable_id,
            },
            associated,
            actor,
            action: columns.action,
            changes: columns.audited_changes,
            comment: columns.comment,
            version: columns.version,
            request_uuid: columns.request_uuid,
            remote_address: columns.remote_address,
            created_at: columns.created_at,
        })
    }
}

/// Caller input for a new audit record
#[derive(Debug, Clone)]
pub struct NewAudit {
    pub auditable: EntityRef,
    pub action: Action,
    pub changes: RawChanges,
    /// Explicit actor; when `None` the ambient actor context is consulted
    pub actor: Option<ActorRef>,
    pub associated: Option<EntityRef>,
    pub comment: Option<String>,
    pub remote_address: Option<String>,
    pub request_uuid: Option<RequestId>,
}

impl NewAudit {
    pub fn new(auditable: EntityRef, action: Action) -> Self {
        Self {
            auditable,
            action,
            changes: RawChanges::new(),
            actor: None,
            associated: None,
            comment: None,
            remote_address: None,
            request_uuid: None,
        }
    }

    pub fn create(auditable: EntityRef, changes: RawChanges) -> Self {
        Self::new(auditable, Action::Create).with_changes(changes)
    }

    pub fn update(auditable: EntityRef, changes: RawChanges) -> Self {
        Self::new(auditable, Action::Update).with_changes(changes)
    }

    pub fn destroy(auditable: EntityRef, changes: RawChanges) -> Self {
        Self::new(auditable, Action::Destroy).with_changes(changes)
    }

    pub fn with_changes(mut self, changes: RawChanges) -> Self {
        self.changes = changes;
        self
    }

    pub fn by(mut self, actor: ActorRef) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn associated_with(mut self, associated: EntityRef) -> Self {
        self.associated = Some(associated);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn from_address(mut self, remote_address: impl Into<String>) -> Self {
        self.remote_address = Some(remote_address.into());
        self
    }

    pub fn in_request(mut self, request_uuid: RequestId) -> Self {
        self.request_uuid = Some(request_uuid);
        self
    }

    /// Reject malformed input before anything is written
    pub fn validate(&self) -> AuditResult<()> {
        if self.auditable.is_blank() {
            return Err(AuditError::Validation(
                "Audit record requires an entity type and id".into(),
            ));
        }

        if let Some(associated) = &self.associated {
            if associated.is_blank() {
                return Err(AuditError::Validation(
                    "Associated entity reference must have a type and id".into(),
                ));
            }
        }

        Ok(())
    }
}
