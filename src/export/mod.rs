//! Export module for revtrail
//!
//! Exports the audit log in multiple formats:
//! - CSV: one row per record, for spreadsheets
//! - JSON: machine-readable full export with metadata
//! - YAML: human-readable full export

pub mod csv;
pub mod json;
pub mod yaml;

pub use csv::{export_history_csv, write_records_csv};
pub use json::{export_history_json, import_from_json, HistoryExport, EXPORT_SCHEMA_VERSION};
pub use yaml::{export_history_yaml, import_from_yaml};
