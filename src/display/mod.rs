//! Display formatting for terminal output
//!
//! Provides table and detail views for audit history, rendered changes and
//! reconstructed revisions.

pub mod history;
pub mod revision;

pub use history::{format_changes, format_history, format_record_details};
pub use revision::{format_instance, format_revision};
