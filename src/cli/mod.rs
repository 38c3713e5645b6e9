//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod audit;
pub mod export;
pub mod revision;

pub use audit::{handle_audit_command, AuditCommands};
pub use export::{handle_export_command, ExportCommands, ExportFormat};
pub use revision::{handle_revision_command, parse_timestamp, RevisionCommands};
