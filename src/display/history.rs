//! History display formatting
//!
//! Formats audit records and rendered changes for terminal output.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::AuditRecord;
use crate::render::{ChangeEntry, Header};

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Version")]
    version: u32,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

/// Format a timestamp with a user-supplied strftime string
///
/// An unusable format falls back to `%Y-%m-%d %H:%M:%S` instead of panicking.
pub fn format_timestamp(at: &DateTime<Utc>, timestamp_format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(timestamp_format)).is_err() {
        return at.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    out
}

/// Format an entity's history as a table, one row per version
pub fn format_history(records: &[AuditRecord], timestamp_format: &str) -> String {
    if records.is_empty() {
        return "No audit records found.".to_string();
    }

    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|record| HistoryRow {
            version: record.version,
            action: record.action.to_string(),
            actor: record
                .actor
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            when: format_timestamp(&record.created_at, timestamp_format),
            fields: record.changes.fields().collect::<Vec<_>>().join(", "),
            comment: record.comment.clone().unwrap_or_default(),
        })
        .collect();

    Table::new(rows).with(Style::psql()).to_string()
}

/// Format rendered change entries as a table
pub fn format_changes(entries: &[ChangeEntry]) -> String {
    if entries.is_empty() {
        return "No displayable changes.".to_string();
    }

    let rows: Vec<ChangeRow> = entries
        .iter()
        .map(|entry| ChangeRow {
            field: entry.subject.clone(),
            from: entry.old_value.clone().unwrap_or_default(),
            to: entry.new_value.clone().unwrap_or_default(),
        })
        .collect();

    Table::new(rows).with(Style::psql()).to_string()
}

/// Format a single record with its rendered header and changes
pub fn format_record_details(
    record: &AuditRecord,
    header: &Header,
    entries: &[ChangeEntry],
    timestamp_format: &str,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", header));
    output.push_str(&format!("  Entity:   {}\n", record.auditable));
    output.push_str(&format!("  Version:  {}\n", record.version));
    output.push_str(&format!("  Action:   {}\n", record.action));
    output.push_str(&format!(
        "  When:     {}\n",
        format_timestamp(&record.created_at, timestamp_format)
    ));
    output.push_str(&format!("  Request:  {}\n", record.request_uuid));

    if let Some(associated) = &record.associated {
        output.push_str(&format!("  Associated: {}\n", associated));
    }
    if let Some(address) = &record.remote_address {
        output.push_str(&format!("  Address:  {}\n", address));
    }
    if let Some(comment) = &record.comment {
        output.push_str(&format!("  Comment:  {}\n", comment));
    }

    output.push('\n');
    output.push_str(&format_changes(entries));
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawChanges;
    use crate::models::{ActorRef, EntityRef, NewAudit, RequestId};

    fn record() -> AuditRecord {
        let new = NewAudit::update(
            EntityRef::new("Pet", 3),
            RawChanges::new().changed("name", "Rex", "Max").set("age", 4),
        )
        .with_comment("renamed");
        AuditRecord::from_new(new, 2, Some(ActorRef::named("alice")), RequestId::new())
    }

    #[test]
    fn test_format_history() {
        let output = format_history(&[record()], "%Y-%m-%d");
        assert!(output.contains("Version"));
        assert!(output.contains("alice"));
        assert!(output.contains("name, age"));
        assert!(output.contains("renamed"));
    }

    #[test]
    fn test_format_empty_history() {
        assert_eq!(format_history(&[], "%Y"), "No audit records found.");
        assert_eq!(format_changes(&[]), "No displayable changes.");
    }

    #[test]
    fn test_format_record_details() {
        let record = record();
        let header = Header {
            actor: "alice".into(),
            verb: "Updated".into(),
            subject: Some("Pet".into()),
        };
        let entries = vec![ChangeEntry {
            subject: "Name".into(),
            old_value: Some("Rex".into()),
            new_value: Some("Max".into()),
        }];

        let output = format_record_details(&record, &header, &entries, "%Y-%m-%d");
        assert!(output.starts_with("alice Updated Pet\n"));
        assert!(output.contains("Entity:   Pet#3"));
        assert!(output.contains("Comment:  renamed"));
        assert!(output.contains("Rex"));
        assert!(output.contains("Max"));
    }

    #[test]
    fn test_bad_timestamp_format_falls_back() {
        let record = record();
        let expected = record.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

        assert_eq!(format_timestamp(&record.created_at, "%Q"), expected);
        assert!(format_history(&[record.clone()], "%Q").contains(&expected));

        let header = Header {
            actor: "alice".into(),
            verb: "Updated".into(),
            subject: None,
        };
        let output = format_record_details(&record, &header, &[], "%Y-%");
        assert!(output.contains(&format!("When:     {}", expected)));
    }
}
