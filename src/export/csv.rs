//! CSV Export functionality
//!
//! One row per audit record; the diff is kept as its JSON text so the file
//! stays loadable by spreadsheets and by `decode`.

use std::io::Write;

use serde::Serialize;

use crate::codec;
use crate::error::{AuditError, AuditResult};
use crate::models::AuditRecord;
use crate::storage::Storage;

#[derive(Serialize)]
struct CsvRow<'a> {
    id: String,
    created_at: String,
    auditable_type: &'a str,
    auditable_id: &'a str,
    version: u32,
    action: &'static str,
    actor: String,
    associated: String,
    comment: &'a str,
    request_uuid: String,
    changes: String,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a AuditRecord) -> AuditResult<Self> {
        Ok(Self {
            id: record.id.as_uuid().to_string(),
            created_at: codec::canonical_timestamp(record.created_at),
            auditable_type: &record.auditable.entity_type,
            auditable_id: record.auditable.id.as_str(),
            version: record.version,
            action: record.action.as_str(),
            actor: record
                .actor
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            associated: record
                .associated
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            comment: record.comment.as_deref().unwrap_or_default(),
            request_uuid: record.request_uuid.as_uuid().to_string(),
            changes: codec::encode(&record.changes)?,
        })
    }
}

/// Export every audit record to CSV
pub fn export_history_csv<W: Write>(storage: &Storage, writer: &mut W) -> AuditResult<()> {
    let records = storage.records().all()?;
    write_records_csv(&records, writer)
}

/// Write the given records as CSV, header first
pub fn write_records_csv<W: Write>(records: &[AuditRecord], writer: &mut W) -> AuditResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for record in records {
        csv_writer
            .serialize(CsvRow::from_record(record)?)
            .map_err(|e| AuditError::Export(e.to_string()))?;
    }

    csv_writer
        .flush()
        .map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}
