//! Revision display formatting

use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::entity::EntityInstance;
use crate::models::{EntityRef, RevisionState};

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn attribute_table<'a>(attributes: impl Iterator<Item = (&'a String, &'a Value)>) -> String {
    let rows: Vec<AttributeRow> = attributes
        .map(|(attribute, value)| AttributeRow {
            attribute: attribute.clone(),
            value: value_text(value),
        })
        .collect();

    if rows.is_empty() {
        return "(no attributes)".to_string();
    }
    Table::new(rows).with(Style::psql()).to_string()
}

/// Format a reconstructed attribute state
pub fn format_revision(key: &EntityRef, state: &RevisionState) -> String {
    if state.is_empty() {
        return format!("{} has no recorded state at this version.", key);
    }

    format!(
        "{} at version {}\n\n{}\n",
        key,
        state.version,
        attribute_table(state.attributes.iter())
    )
}

/// Format a materialized instance, noting whether it still exists
pub fn format_instance(instance: &EntityInstance) -> String {
    let status = if instance.is_new_record() {
        "not live"
    } else {
        "live"
    };
    let id = instance
        .id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let version = instance
        .version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}#{} ({}) at version {}\n\n{}\n",
        instance.entity_type,
        id,
        status,
        version,
        attribute_table(instance.attributes.iter())
    )
}
