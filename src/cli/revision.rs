//! CLI commands for revision reconstruction

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{format_instance, format_revision};
use crate::entity::AuditBackedEntities;
use crate::error::{AuditError, AuditResult};
use crate::models::{EntityRef, RevisionState};
use crate::services::AuditService;
use crate::storage::Storage;

/// Revision subcommands
#[derive(Subcommand, Debug)]
pub enum RevisionCommands {
    /// Reconstruct an entity as of a version or a point in time
    Show {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: String,
        /// Target version (default: latest)
        #[arg(long, conflicts_with = "at")]
        version: Option<u32>,
        /// Point in time: RFC 3339, "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DD" (UTC)
        #[arg(long)]
        at: Option<String>,
    },

    /// List every successive revision of an entity
    List {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: String,
    },
}

/// Handle revision commands
pub fn handle_revision_command(
    storage: &Storage,
    settings: &Settings,
    cmd: RevisionCommands,
) -> AuditResult<()> {
    let service = AuditService::with_settings(storage, settings);

    match cmd {
        RevisionCommands::Show {
            entity_type,
            id,
            version,
            at,
        } => {
            let key = EntityRef::new(entity_type, id);

            let state = match (version, at) {
                (_, Some(at)) => {
                    let at = parse_timestamp(&at)?;
                    match service.revision_at(&key, at)? {
                        Some(state) => state,
                        None => {
                            println!("{} has no recorded state as of {}.", key, at);
                            return Ok(());
                        }
                    }
                }
                (Some(version), None) => service.reconstruct(&key, version)?,
                (None, None) => service.reconstruct(&key, u32::MAX)?,
            };

            print_state(&service, storage, &key, &state)?;
        }

        RevisionCommands::List { entity_type, id } => {
            let key = EntityRef::new(entity_type, id);
            let revisions = service.revisions(&key)?;

            if revisions.is_empty() {
                println!("No recorded revisions of {}.", key);
                return Ok(());
            }

            for (i, state) in revisions.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{}", format_revision(&key, state));
            }
        }
    }

    Ok(())
}

/// Print a tracked type as a materialized instance, anything else as raw state
fn print_state(
    service: &AuditService<'_>,
    storage: &Storage,
    key: &EntityRef,
    state: &RevisionState,
) -> AuditResult<()> {
    if storage.types().contains(&key.entity_type) {
        let entities = AuditBackedEntities::new(storage);
        let instance = service.materialize(state, key, &entities)?;
        println!("{}", format_instance(&instance));
    } else {
        println!("{}", format_revision(key, state));
    }
    Ok(())
}

/// Parse a point in time given on the command line
///
/// A bare date means the end of that day.
pub fn parse_timestamp(text: &str) -> AuditResult<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(at.and_utc());
    }
    if let Some(at) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
    {
        return Ok(at.and_utc());
    }

    Err(AuditError::Validation(format!(
        "Invalid timestamp: '{}'. Use RFC 3339, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'",
        text
    )))
}
