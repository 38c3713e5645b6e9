//! Change rendering
//!
//! Turns an audit record into a header and a list of display entries. Each
//! field goes through, in order: hide, key-only, mask, foreign-key name
//! resolution, empty-string normalization. Rendering is best effort: a field
//! whose rendering fails is logged and left out, the rest still render.

pub mod changes;
pub mod display_map;
pub mod header;

pub use changes::ChangeEntry;
pub use display_map::{DisplayMap, DisplayTitle};
pub use header::Header;

use serde_json::Value;
use tracing::warn;

use crate::config::settings::Settings;
use crate::entity::{EntitySource, TrackedTypes};
use crate::error::{AuditError, AuditResult};
use crate::inflect;
use crate::models::{Action, ActorRef, AuditRecord, ChangeValue, EntityId, EntityRef};

use changes::blank_to_null;

/// Actor value that stands for "no real user"
const ANONYMOUS_ACTOR: &str = "0";

/// Renders audit records for display
pub struct Renderer<'a> {
    types: &'a TrackedTypes,
    entities: &'a dyn EntitySource,
    default_actor: String,
}

impl<'a> Renderer<'a> {
    pub fn new(types: &'a TrackedTypes, entities: &'a dyn EntitySource) -> Self {
        Self {
            types,
            entities,
            default_actor: Settings::default().default_actor,
        }
    }

    pub fn with_settings(
        types: &'a TrackedTypes,
        entities: &'a dyn EntitySource,
        settings: &Settings,
    ) -> Self {
        Self {
            types,
            entities,
            default_actor: settings.default_actor.clone(),
        }
    }

    /// Display map registered for the record's type, or the empty map
    pub fn display_map_for(&self, record: &AuditRecord) -> DisplayMap {
        self.types
            .display_map(&record.auditable.entity_type)
            .unwrap_or_default()
    }

    pub fn render_header(&self, record: &AuditRecord, map: &DisplayMap) -> Header {
        let subject = match &map.display_title {
            Some(DisplayTitle::None) => None,
            Some(DisplayTitle::Text(title)) => Some(title.clone()),
            None => Some(record.auditable.entity_type.clone()),
        };
        let verb = Header::verb_for(record.action, map.parent, subject.as_deref());

        Header {
            actor: self.actor_name(record.actor.as_ref()),
            verb: verb.to_string(),
            subject,
        }
    }

    fn actor_name(&self, actor: Option<&ActorRef>) -> String {
        match actor {
            Some(ActorRef::Named(name)) if name != ANONYMOUS_ACTOR => name.clone(),
            Some(ActorRef::Entity(reference)) => match self.entities.find(reference) {
                Ok(found) => found
                    .and_then(|user| user.person_name())
                    .unwrap_or_else(|| self.default_actor.clone()),
                Err(err) => {
                    warn!(actor = %reference, error = %err, "could not load actor");
                    self.default_actor.clone()
                }
            },
            _ => self.default_actor.clone(),
        }
    }

    /// Whether the record has anything worth showing
    pub fn is_displayable(&self, record: &AuditRecord, map: &DisplayMap) -> bool {
        let structural = matches!(record.action, Action::Create | Action::Destroy)
            && (map.parent
                || self
                    .render_header(record, map)
                    .subject
                    .is_some_and(|s| !s.is_empty()));

        structural || !self.render_changes(record, map).is_empty()
    }

    /// Display entries for every field of the record, in stored order
    pub fn render_changes(&self, record: &AuditRecord, map: &DisplayMap) -> Vec<ChangeEntry> {
        record
            .changes
            .iter()
            .filter_map(|(field, change)| {
                match self.render_field(record, map, field, change) {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(record = %record.id, field, error = %err, "dropping unrenderable field");
                        None
                    }
                }
            })
            .collect()
    }

    /// Header line followed by one line per entry
    pub fn render_summary(&self, record: &AuditRecord, map: &DisplayMap) -> String {
        let mut lines = vec![self.render_header(record, map).to_string()];
        lines.extend(
            self.render_changes(record, map)
                .iter()
                .map(|entry| format!("  - {}", entry.describe())),
        );
        lines.join("\n")
    }

    fn render_field(
        &self,
        record: &AuditRecord,
        map: &DisplayMap,
        field: &str,
        change: &ChangeValue,
    ) -> AuditResult<Option<ChangeEntry>> {
        if map.hide.contains(field) {
            return Ok(None);
        }
        if map.key_only.contains(field) {
            return Ok(Some(ChangeEntry::key_only(inflect::humanize(field))));
        }

        let mut subject = inflect::humanize(field);
        let mut old = change.old_value().clone();
        let mut new = change.new_value().clone();

        if map.mask.contains_key(field) {
            old = map.apply_mask(field, &old).unwrap_or(old);
            new = map.apply_mask(field, &new).unwrap_or(new);
        } else if inflect::is_foreign_key(field) {
            if let Some((label, resolved_old, resolved_new)) =
                self.resolve_foreign_key(&record.auditable.entity_type, field, &old, &new)?
            {
                subject = label;
                old = resolved_old;
                new = resolved_new;
            }
        }

        Ok(ChangeEntry::from_values(
            subject,
            &blank_to_null(old),
            &blank_to_null(new),
        ))
    }

    /// Replace related ids with display names
    ///
    /// `None` when the relationship is unknown, polymorphic, or neither side
    /// resolves; a side that does not resolve keeps its raw id.
    fn resolve_foreign_key(
        &self,
        owner_type: &str,
        field: &str,
        old: &Value,
        new: &Value,
    ) -> AuditResult<Option<(String, Value, Value)>> {
        let relationship = match self.types.relationship(owner_type, field) {
            Some(relationship) if !relationship.polymorphic => relationship,
            _ => return Ok(None),
        };
        let target = relationship.target_type();

        let resolve = |value: &Value| -> AuditResult<Option<String>> {
            let Some(id) = EntityId::from_value(value) else {
                return Ok(None);
            };
            let key = EntityRef::new(target.clone(), id);
            let found = self
                .entities
                .find(&key)
                .map_err(|e| AuditError::render(field, e.to_string()))?;
            Ok(found.and_then(|entity| entity.display_name()))
        };

        let old_name = resolve(old)?;
        let new_name = resolve(new)?;
        if old_name.is_none() && new_name.is_none() {
            return Ok(None);
        }

        let label = inflect::humanize(inflect::strip_foreign_key(field));
        Ok(Some((
            label,
            old_name.map(Value::String).unwrap_or_else(|| old.clone()),
            new_name.map(Value::String).unwrap_or_else(|| new.clone()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RawChanges, RawValue};
    use crate::entity::{EntityInstance, EntitySchema, MemoryEntities, Relationship};
    use crate::models::{NewAudit, RequestId};
    use pretty_assertions::assert_eq;

    fn types() -> TrackedTypes {
        TrackedTypes::from_schemas([
            EntitySchema::new("Owner"),
            EntitySchema::new("Country"),
            EntitySchema::new("Pet")
                .with_relationship(Relationship::belongs_to("owner_id"))
                .with_relationship(Relationship::belongs_to("lookup_country_id").with_target("Country"))
                .with_relationship(Relationship::polymorphic("subject_id")),
        ])
        .unwrap()
    }

    fn entities() -> MemoryEntities {
        let entities = MemoryEntities::new();
        entities
            .insert(EntityInstance::new("Owner").with_id(1).with_attribute("name", "Alice"))
            .unwrap();
        entities
            .insert(EntityInstance::new("Owner").with_id(2).with_attribute("name", "Bob"))
            .unwrap();
        entities
            .insert(EntityInstance::new("Country").with_id(5).with_attribute("title", "France"))
            .unwrap();
        entities
            .insert(
                EntityInstance::new("User")
                    .with_id(9)
                    .with_attribute("first_name", "Ada")
                    .with_attribute("last_name", "Lovelace"),
            )
            .unwrap();
        entities
    }

    fn record(action: Action, changes: RawChanges) -> AuditRecord {
        let new = NewAudit::new(EntityRef::new("Pet", 3), action).with_changes(changes);
        AuditRecord::from_new(new, 1, None, RequestId::new())
    }

    fn entry(subject: &str, old: Option<&str>, new: Option<&str>) -> ChangeEntry {
        ChangeEntry {
            subject: subject.into(),
            old_value: old.map(String::from),
            new_value: new.map(String::from),
        }
    }

    #[test]
    fn test_masking() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let map = DisplayMap::new().mask("status", [(1, "Active"), (2, "Inactive")]);

        let r = record(Action::Update, RawChanges::new().changed("status", 1, 2));
        assert_eq!(
            renderer.render_changes(&r, &map),
            vec![entry("Status", Some("Active"), Some("Inactive"))]
        );
    }

    #[test]
    fn test_mask_passes_unknown_values_and_keeps_null() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let map = DisplayMap::new().mask("status", [(1, "Active")]);

        let r = record(
            Action::Update,
            RawChanges::new().changed("status", RawValue::null(), 7),
        );
        assert_eq!(renderer.render_changes(&r, &map), vec![entry("Status", None, Some("7"))]);
    }

    #[test]
    fn test_hide_and_key_only() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let map = DisplayMap::new().hide("password").key_only("notes");

        let r = record(
            Action::Update,
            RawChanges::new()
                .changed("password", "a", "b")
                .changed("notes", "old text", "new text")
                .changed("name", "Rex", "Max"),
        );
        assert_eq!(
            renderer.render_changes(&r, &map),
            vec![
                entry("Notes", None, None),
                entry("Name", Some("Rex"), Some("Max")),
            ]
        );
    }

    #[test]
    fn test_foreign_key_resolution() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);

        let r = record(Action::Update, RawChanges::new().changed("owner_id", 1, 2));
        assert_eq!(
            renderer.render_changes(&r, &DisplayMap::new()),
            vec![entry("Owner", Some("Alice"), Some("Bob"))]
        );
    }

    #[test]
    fn test_lookup_prefix_stripped_from_label() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);

        let r = record(
            Action::Update,
            RawChanges::new().changed("lookup_country_id", RawValue::null(), 5),
        );
        assert_eq!(
            renderer.render_changes(&r, &DisplayMap::new()),
            vec![entry("Country", None, Some("France"))]
        );
    }

    #[test]
    fn test_unresolvable_and_polymorphic_keys_show_raw_ids() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);

        let r = record(
            Action::Update,
            RawChanges::new()
                .changed("owner_id", 1, 404)
                .changed("subject_id", 1, 2)
                .changed("vet_id", 1, 2),
        );
        assert_eq!(
            renderer.render_changes(&r, &DisplayMap::new()),
            vec![
                entry("Owner", Some("Alice"), Some("404")),
                entry("Subject", Some("1"), Some("2")),
                entry("Vet", Some("1"), Some("2")),
            ]
        );
    }

    #[test]
    fn test_create_only_and_empty_strings() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);

        let r = record(
            Action::Create,
            RawChanges::new()
                .set("name", "Bob")
                .changed("nickname", "", "X")
                .changed("color", "", RawValue::null()),
        );
        let entries = renderer.render_changes(&r, &DisplayMap::new());
        assert_eq!(
            entries,
            vec![entry("Name", None, Some("Bob")), entry("Nickname", None, Some("X"))]
        );
        assert_eq!(entries[0].describe(), "Name set to Bob");
    }

    #[test]
    fn test_render_is_idempotent() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let map = DisplayMap::new().mask("status", [(1, "Active")]).hide("secret");

        let r = record(
            Action::Update,
            RawChanges::new()
                .changed("status", 1, 2)
                .changed("owner_id", 1, 2)
                .changed("secret", 1, 2),
        );
        assert_eq!(renderer.render_changes(&r, &map), renderer.render_changes(&r, &map));
    }

    /// Source that fails for one type
    struct FlakySource(MemoryEntities);

    impl EntitySource for FlakySource {
        fn find(&self, key: &EntityRef) -> AuditResult<Option<EntityInstance>> {
            if key.entity_type == "Country" {
                return Err(AuditError::Persistence("lookup timed out".into()));
            }
            self.0.find(key)
        }
    }

    #[test]
    fn test_failing_field_is_dropped() {
        let types = types();
        let source = FlakySource(entities());
        let renderer = Renderer::new(&types, &source);

        let r = record(
            Action::Update,
            RawChanges::new()
                .changed("lookup_country_id", 5, 6)
                .changed("owner_id", 1, 2),
        );
        assert_eq!(
            renderer.render_changes(&r, &DisplayMap::new()),
            vec![entry("Owner", Some("Alice"), Some("Bob"))]
        );
    }

    #[test]
    fn test_header_actor() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let map = DisplayMap::new();

        let mut r = record(Action::Update, RawChanges::new());
        assert_eq!(renderer.render_header(&r, &map).actor, "System");

        r.actor = Some(ActorRef::named("cron"));
        assert_eq!(renderer.render_header(&r, &map).actor, "cron");

        r.actor = Some(ActorRef::named("0"));
        assert_eq!(renderer.render_header(&r, &map).actor, "System");

        r.actor = Some(ActorRef::entity(EntityRef::new("User", 9)));
        assert_eq!(renderer.render_header(&r, &map).actor, "Ada Lovelace");

        r.actor = Some(ActorRef::entity(EntityRef::new("User", 10)));
        let settings = Settings {
            default_actor: "Nobody".into(),
            ..Settings::default()
        };
        let renderer = Renderer::with_settings(&types, &entities, &settings);
        assert_eq!(renderer.render_header(&r, &map).actor, "Nobody");
    }

    #[test]
    fn test_header_subject_and_verb() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let r = record(Action::Create, RawChanges::new());

        let header = renderer.render_header(&r, &DisplayMap::new());
        assert_eq!(header.subject.as_deref(), Some("Pet"));
        assert_eq!(header.verb, "Added");

        let header = renderer.render_header(&r, &DisplayMap::new().title("none"));
        assert_eq!(header.subject, None);
        assert_eq!(header.verb, "Updated");

        let header = renderer.render_header(&r, &DisplayMap::new().title("none").parent(true));
        assert_eq!(header.verb, "Added");

        let destroy = record(Action::Destroy, RawChanges::new());
        let header = renderer.render_header(&destroy, &DisplayMap::new().title("Companion"));
        assert_eq!(header.subject.as_deref(), Some("Companion"));
        assert_eq!(header.verb, "Removed");
    }

    #[test]
    fn test_is_displayable() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let untitled = DisplayMap::new().title("none");

        let create = record(Action::Create, RawChanges::new());
        assert!(renderer.is_displayable(&create, &DisplayMap::new()));
        assert!(!renderer.is_displayable(&create, &untitled));
        assert!(renderer.is_displayable(&create, &untitled.clone().parent(true)));

        let empty_update = record(Action::Update, RawChanges::new().changed("name", "", RawValue::null()));
        assert!(!renderer.is_displayable(&empty_update, &DisplayMap::new()));

        let update = record(Action::Update, RawChanges::new().changed("name", "a", "b"));
        assert!(renderer.is_displayable(&update, &untitled));
    }

    #[test]
    fn test_render_summary() {
        let (types, entities) = (types(), entities());
        let renderer = Renderer::new(&types, &entities);
        let mut r = record(
            Action::Update,
            RawChanges::new().changed("owner_id", 1, 2).set("name", "Rex"),
        );
        r.actor = Some(ActorRef::named("cron"));

        assert_eq!(
            renderer.render_summary(&r, &DisplayMap::new()),
            "cron Updated Pet\n  - Owner changed from Alice to Bob\n  - Name set to Rex"
        );
    }
}
