//! CLI commands for recording and querying audit history
//!
//! Implements the audit subcommands using the AuditService and Renderer.

use clap::Subcommand;

use crate::codec::{self, RawChanges};
use crate::config::settings::Settings;
use crate::context;
use crate::display::{format_changes, format_history, format_record_details};
use crate::entity::AuditBackedEntities;
use crate::error::{AuditError, AuditResult};
use crate::models::{Action, ActorRef, EntityRef, NewAudit, RequestId};
use crate::render::Renderer;
use crate::services::AuditService;
use crate::storage::Storage;

/// Audit subcommands
#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Record a change to an entity
    Record {
        /// Entity type (e.g. "Pet")
        entity_type: String,
        /// Entity id
        id: String,
        /// Action: create, update or destroy
        #[arg(short, long, default_value = "update")]
        action: String,
        /// Changes as a JSON object; each value is the new value, an [old, new]
        /// pair, or {"$set": [...]} for a new value that is itself an array
        #[arg(short, long, default_value = "{}")]
        changes: String,
        /// Free-text actor name
        #[arg(long, conflicts_with = "user")]
        actor: Option<String>,
        /// Actor entity as TYPE#ID
        #[arg(long)]
        user: Option<EntityRef>,
        /// Comment stored with the record
        #[arg(short = 'm', long)]
        comment: Option<String>,
        /// Associated entity as TYPE#ID
        #[arg(long)]
        associated: Option<EntityRef>,
        /// Remote address of the change
        #[arg(long)]
        remote_address: Option<String>,
        /// Request id to correlate with other records
        #[arg(long)]
        request: Option<RequestId>,
        /// Ambient actor used when neither --actor nor --user is given
        #[arg(long = "as", env = "REVTRAIL_ACTOR")]
        run_as: Option<String>,
    },

    /// Show the history of an entity
    History {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: String,
        /// Only records with this action
        #[arg(short, long)]
        action: Option<String>,
        /// Lowest version to include
        #[arg(long)]
        from: Option<u32>,
        /// Highest version to include
        #[arg(long)]
        to: Option<u32>,
        /// Include records that name this entity as associated
        #[arg(long)]
        with_associated: bool,
    },

    /// Show one recorded version with its rendered changes
    Show {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: String,
        /// Version to show (default: latest)
        version: Option<u32>,
        /// Print a one-paragraph summary instead of tables
        #[arg(short, long)]
        summary: bool,
    },

    /// Show histories of destroyed entities that belonged to an owner
    Deleted {
        /// Owner entity type
        owner_type: String,
        /// Owner entity id
        owner_id: String,
        /// Only children of this type
        #[arg(short, long)]
        child: Option<String>,
    },

    /// Show every record written under one request id
    Request {
        /// Request id (UUID or short "req-" form)
        request: RequestId,
    },

    /// List tracked entity types
    Types,
}

/// Handle audit commands
pub fn handle_audit_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AuditCommands,
) -> AuditResult<()> {
    let service = AuditService::with_settings(storage, settings);

    match cmd {
        AuditCommands::Record {
            entity_type,
            id,
            action,
            changes,
            actor,
            user,
            comment,
            associated,
            remote_address,
            request,
            run_as,
        } => {
            let action: Action = action.parse()?;
            let changes = RawChanges::from(codec::decode(&changes)?);

            let mut new = NewAudit::new(EntityRef::new(entity_type, id), action).with_changes(changes);
            if let Some(name) = actor {
                new = new.by(ActorRef::named(name));
            }
            if let Some(user) = user {
                new = new.by(ActorRef::entity(user));
            }
            if let Some(comment) = comment {
                new = new.with_comment(comment);
            }
            if let Some(associated) = associated {
                new = new.associated_with(associated);
            }
            if let Some(address) = remote_address {
                new = new.from_address(address);
            }
            if let Some(request) = request {
                new = new.in_request(request);
            }

            let record = match run_as {
                Some(name) => context::run_as(ActorRef::named(name), || service.create(new))?,
                None => service.create(new)?,
            };

            println!(
                "Recorded {} of {} as version {}",
                record.action, record.auditable, record.version
            );
            println!("  Request: {}", record.request_uuid.as_uuid());
        }

        AuditCommands::History {
            entity_type,
            id,
            action,
            from,
            to,
            with_associated,
        } => {
            let key = EntityRef::new(entity_type, id);

            let mut records = if with_associated {
                service.find_associated(&key)?
            } else {
                service.find_all_for_entity(&key)?
            };

            if let Some(action) = action {
                let action: Action = action.parse()?;
                records.retain(|r| r.action == action);
            }
            let from = from.unwrap_or(1);
            let to = to.unwrap_or(u32::MAX);
            if from > to {
                return Err(AuditError::Validation(format!(
                    "Invalid version range: {} is greater than {}",
                    from, to
                )));
            }
            records.retain(|r| r.auditable != key || (from..=to).contains(&r.version));

            println!("History of {}", key);
            println!("{}", format_history(&records, &settings.timestamp_format));
        }

        AuditCommands::Show {
            entity_type,
            id,
            version,
            summary,
        } => {
            let key = EntityRef::new(entity_type, id);
            let record = match version {
                Some(version) => service
                    .find_by_version_range(&key, version, version)?
                    .pop()
                    .ok_or_else(|| {
                        AuditError::not_found("Audit record", format!("{} version {}", key, version))
                    })?,
                None => service
                    .latest_for_entity(&key)?
                    .ok_or_else(|| AuditError::not_found("Audit record", key.to_string()))?,
            };

            let entities = AuditBackedEntities::new(storage);
            let renderer = Renderer::with_settings(storage.types(), &entities, settings);
            let map = renderer.display_map_for(&record);

            if summary {
                println!("{}", renderer.render_summary(&record, &map));
            } else {
                let header = renderer.render_header(&record, &map);
                let entries = renderer.render_changes(&record, &map);
                println!(
                    "{}",
                    format_record_details(&record, &header, &entries, &settings.timestamp_format)
                );
            }
        }

        AuditCommands::Deleted {
            owner_type,
            owner_id,
            child,
        } => {
            let owner = EntityRef::new(owner_type, owner_id);
            let records = service.find_deleted_associations(&owner, child.as_deref())?;

            if records.is_empty() {
                println!("No destroyed entities belonged to {}.", owner);
                return Ok(());
            }

            println!("Destroyed entities that belonged to {}", owner);
            let mut rest = records.as_slice();
            while let Some(first) = rest.first() {
                let len = rest
                    .iter()
                    .take_while(|r| r.auditable == first.auditable)
                    .count();
                let (history, tail) = rest.split_at(len);
                println!();
                println!("{}", first.auditable);
                println!("{}", format_history(history, &settings.timestamp_format));
                rest = tail;
            }
        }

        AuditCommands::Request { request } => {
            let records = service.find_by_request(request)?;

            println!("Records in request {}", request.as_uuid());
            println!("{}", format_history(&records, &settings.timestamp_format));

            let entities = AuditBackedEntities::new(storage);
            let renderer = Renderer::with_settings(storage.types(), &entities, settings);
            for record in &records {
                let map = renderer.display_map_for(record);
                if renderer.is_displayable(record, &map) {
                    println!();
                    println!(
                        "{} ({} v{})",
                        renderer.render_header(record, &map),
                        record.auditable,
                        record.version
                    );
                    println!("{}", format_changes(&renderer.render_changes(record, &map)));
                }
            }
        }

        AuditCommands::Types => {
            let schemas = service.audited_type_names();
            if schemas.is_empty() {
                println!("No tracked types configured.");
                println!("Describe your entity types in the schema file to enable rendering.");
                return Ok(());
            }

            println!("Tracked types:");
            for schema in schemas {
                match &schema.base {
                    Some(base) => println!("  {} (inherits {})", schema.name, base),
                    None => println!("  {}", schema.name),
                }
            }
        }
    }

    Ok(())
}
