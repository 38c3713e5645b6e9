//! YAML Export functionality
//!
//! Exports the audit log to YAML for human-readable archives.

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::export::json::HistoryExport;
use crate::storage::Storage;

fn export_err(e: impl std::fmt::Display) -> AuditError {
    AuditError::Export(e.to_string())
}

/// Export the full audit log to YAML
pub fn export_history_yaml<W: Write>(storage: &Storage, writer: &mut W) -> AuditResult<()> {
    let export = HistoryExport::from_storage(storage)?;

    writeln!(writer, "# revtrail audit log export").map_err(export_err)?;
    writeln!(writer, "# Generated: {}", export.exported_at).map_err(export_err)?;
    writeln!(writer, "# App Version: {}", export.app_version).map_err(export_err)?;
    writeln!(writer).map_err(export_err)?;

    serde_yaml::to_writer(writer, &export).map_err(export_err)?;

    Ok(())
}

/// Read back a YAML export
pub fn import_from_yaml(yaml_str: &str) -> AuditResult<HistoryExport> {
    let export: HistoryExport = serde_yaml::from_str(yaml_str).map_err(export_err)?;

    export.validate().map_err(AuditError::Export)?;

    Ok(export)
}
