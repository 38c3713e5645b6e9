//! JSON Export functionality
//!
//! Exports the complete audit log to JSON with schema versioning.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::models::{AuditRecord, EntityRef};
use crate::storage::Storage;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Full audit log export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    /// Tracked type names at export time
    pub tracked_types: Vec<String>,

    /// Every record, in insertion order
    pub records: Vec<AuditRecord>,

    pub metadata: ExportMetadata,
}

/// Export metadata for reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub record_count: usize,

    /// Number of distinct audited entities
    pub entity_count: usize,

    pub earliest_record: Option<DateTime<Utc>>,

    pub latest_record: Option<DateTime<Utc>>,
}

impl HistoryExport {
    /// Collect the export from storage
    pub fn from_storage(storage: &Storage) -> AuditResult<Self> {
        let records = storage.records().all()?;

        let entities: HashSet<&EntityRef> = records.iter().map(|r| &r.auditable).collect();
        let metadata = ExportMetadata {
            record_count: records.len(),
            entity_count: entities.len(),
            earliest_record: records.iter().map(|r| r.created_at).min(),
            latest_record: records.iter().map(|r| r.created_at).max(),
        };

        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            tracked_types: storage.types().names(),
            records,
            metadata,
        })
    }

    /// Check the schema version and that every entity's versions run 1..N
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        let mut versions: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for record in &self.records {
            versions
                .entry(record.auditable.to_string())
                .or_default()
                .push(record.version);
        }

        for (entity, mut seen) in versions {
            seen.sort_unstable();
            let expected: Vec<u32> = (1..=seen.len() as u32).collect();
            if seen != expected {
                return Err(format!(
                    "Versions of {} are not a gapless sequence: {:?}",
                    entity, seen
                ));
            }
        }

        Ok(())
    }
}

/// Export the full audit log to JSON
pub fn export_history_json<W: Write>(
    storage: &Storage,
    writer: &mut W,
    pretty: bool,
) -> AuditResult<()> {
    let export = HistoryExport::from_storage(storage)?;

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}

/// Read back a JSON export (for verification)
pub fn import_from_json(json_str: &str) -> AuditResult<HistoryExport> {
    let export: HistoryExport =
        serde_json::from_str(json_str).map_err(|e| AuditError::Export(e.to_string()))?;

    export.validate().map_err(AuditError::Export)?;

    Ok(export)
}
