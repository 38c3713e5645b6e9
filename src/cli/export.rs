//! CLI commands for audit log export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};

use crate::error::{AuditError, AuditResult};
use crate::export::{csv, json, yaml};
use crate::models::EntityRef;
use crate::services::AuditService;
use crate::storage::Storage;

/// Export format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    /// CSV format, one row per record
    Csv,
    /// JSON format (full log with metadata)
    Json,
    /// YAML format (full log, human-readable)
    Yaml,
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export the whole audit log to a file
    All {
        /// Output file path
        output: PathBuf,

        /// Export format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Export one entity's history to CSV
    Entity {
        /// Entity type
        entity_type: String,
        /// Entity id
        id: String,
        /// Output file path
        output: PathBuf,
    },

    /// Show export information without writing files
    Info,
}

/// Handle export commands
pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> AuditResult<()> {
    match cmd {
        ExportCommands::All {
            output,
            format,
            pretty,
        } => handle_export_all(storage, output, format, pretty),
        ExportCommands::Entity {
            entity_type,
            id,
            output,
        } => handle_export_entity(storage, EntityRef::new(entity_type, id), output),
        ExportCommands::Info => handle_export_info(storage),
    }
}

fn create_output(output: &Path) -> AuditResult<BufWriter<File>> {
    let file = File::create(output).map_err(|e| {
        AuditError::Export(format!(
            "Failed to create file {}: {}",
            output.display(),
            e
        ))
    })?;
    Ok(BufWriter::new(file))
}

fn handle_export_all(
    storage: &Storage,
    output: PathBuf,
    format: ExportFormat,
    pretty: bool,
) -> AuditResult<()> {
    let mut writer = create_output(&output)?;

    match format {
        ExportFormat::Csv => csv::export_history_csv(storage, &mut writer)?,
        ExportFormat::Json => json::export_history_json(storage, &mut writer, pretty)?,
        ExportFormat::Yaml => yaml::export_history_yaml(storage, &mut writer)?,
    }
    writer.flush()?;

    let count = storage.records().count()?;
    println!("Exported {} audit records to: {}", count, output.display());

    Ok(())
}

fn handle_export_entity(storage: &Storage, key: EntityRef, output: PathBuf) -> AuditResult<()> {
    let records = AuditService::new(storage).find_all_for_entity(&key)?;
    if records.is_empty() {
        return Err(AuditError::not_found("Audit history", key.to_string()));
    }

    let mut writer = create_output(&output)?;
    csv::write_records_csv(&records, &mut writer)?;
    writer.flush()?;

    println!(
        "Exported {} versions of {} to: {}",
        records.len(),
        key,
        output.display()
    );

    Ok(())
}

fn handle_export_info(storage: &Storage) -> AuditResult<()> {
    let export = json::HistoryExport::from_storage(storage)?;

    println!("Export Information");
    println!("==================\n");

    println!("Schema Version: {}", export.schema_version);
    println!("App Version:    {}", export.app_version);
    println!();

    println!("Data Summary:");
    println!("  Records:       {}", export.metadata.record_count);
    println!("  Entities:      {}", export.metadata.entity_count);
    println!("  Tracked types: {}", export.tracked_types.len());
    println!();

    if let Some(earliest) = &export.metadata.earliest_record {
        println!("Record Date Range:");
        println!("  Earliest: {}", earliest);
    }
    if let Some(latest) = &export.metadata.latest_record {
        println!("  Latest:   {}", latest);
    }

    println!("\nAvailable Export Formats:");
    println!("  csv  - CSV format, one row per record");
    println!("  json - JSON format (full log, machine-readable)");
    println!("  yaml - YAML format (full log, human-readable)");

    println!("\nExamples:");
    println!("  revtrail export all audits.json --format json --pretty");
    println!("  revtrail export entity Pet 1 pet-1.csv");

    Ok(())
}
