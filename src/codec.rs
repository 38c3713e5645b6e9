//! ChangeSet codec
//!
//! Captured diffs arrive as `RawChanges`, which may carry native chrono
//! values. Before a record is first persisted they are normalized into a
//! `ChangeSet` whose values are plain JSON, with every temporal value written
//! as a canonical `%Y-%m-%d %H:%M:%S` string in UTC. Stored records are never
//! normalized again on read.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::AuditResult;
use crate::models::{AuditRecord, ChangeSet, ChangeValue};

/// Canonical storage format for temporal values
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A captured attribute value, possibly temporal
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Json(Value),
    Date(NaiveDate),
    /// Time of day with no date; stored on the 2000-01-01 epoch date
    Time(NaiveTime),
    /// Wall-clock timestamp with no zone, taken to be UTC
    DateTime(NaiveDateTime),
    Zoned(DateTime<Utc>),
}

impl RawValue {
    pub fn null() -> Self {
        Self::Json(Value::Null)
    }

    pub fn is_temporal(&self) -> bool {
        !matches!(self, RawValue::Json(_))
    }

    /// Convert to the stored JSON form
    pub fn normalize(self) -> Value {
        match self {
            RawValue::Json(value) => value,
            RawValue::Date(date) => {
                let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
                Value::String(canonical_timestamp(Utc.from_utc_datetime(&midnight)))
            }
            RawValue::Time(time) => {
                let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
                Value::String(canonical_timestamp(Utc.from_utc_datetime(&epoch.and_time(time))))
            }
            RawValue::DateTime(naive) => {
                Value::String(canonical_timestamp(Utc.from_utc_datetime(&naive)))
            }
            RawValue::Zoned(zoned) => Value::String(canonical_timestamp(zoned)),
        }
    }
}

macro_rules! raw_json_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for RawValue {
            fn from(value: $ty) -> Self {
                RawValue::Json(Value::from(value))
            }
        })*
    };
}

raw_json_from!(Value, &str, String, i32, i64, u32, u64, f64, bool);

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        RawValue::Date(value)
    }
}

impl From<NaiveTime> for RawValue {
    fn from(value: NaiveTime) -> Self {
        RawValue::Time(value)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        RawValue::DateTime(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Zoned(value)
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        RawValue::Zoned(value.with_timezone(&Utc))
    }
}

impl From<DateTime<Local>> for RawValue {
    fn from(value: DateTime<Local>) -> Self {
        RawValue::Zoned(value.with_timezone(&Utc))
    }
}

/// A captured change of one field, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawChange {
    Changed(RawValue, RawValue),
    Set(RawValue),
}

/// Captured diff in field order, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChanges {
    entries: Vec<(String, RawChange)>,
}

impl RawChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an old → new change
    pub fn changed(
        mut self,
        field: impl Into<String>,
        old: impl Into<RawValue>,
        new: impl Into<RawValue>,
    ) -> Self {
        self.push(field.into(), RawChange::Changed(old.into(), new.into()));
        self
    }

    /// Record a bare value with no prior state
    pub fn set(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(field.into(), RawChange::Set(value.into()));
        self
    }

    fn push(&mut self, field: String, change: RawChange) {
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = change,
            None => self.entries.push((field, change)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<ChangeSet> for RawChanges {
    fn from(set: ChangeSet) -> Self {
        let entries = set
            .into_iter()
            .map(|(field, change)| {
                let raw = match change {
                    ChangeValue::Changed(old, new) => {
                        RawChange::Changed(RawValue::Json(old), RawValue::Json(new))
                    }
                    ChangeValue::Set(value) => RawChange::Set(RawValue::Json(value)),
                };
                (field, raw)
            })
            .collect();
        Self { entries }
    }
}

/// Format a UTC timestamp in the canonical storage format
pub fn canonical_timestamp(at: DateTime<Utc>) -> String {
    at.format(CANONICAL_TIMESTAMP_FORMAT).to_string()
}

/// Normalize a captured diff for storage
///
/// Temporal values become canonical strings; each side of a pair is
/// normalized independently; everything else passes through unchanged.
pub fn normalize_for_storage(raw: RawChanges) -> ChangeSet {
    raw.entries
        .into_iter()
        .map(|(field, change)| {
            let stored = match change {
                RawChange::Changed(old, new) => ChangeValue::Changed(old.normalize(), new.normalize()),
                RawChange::Set(value) => ChangeValue::Set(value.normalize()),
            };
            (field, stored)
        })
        .collect()
}

/// Project the value after each change
pub fn new_attributes(record: &AuditRecord) -> Map<String, Value> {
    record
        .changes
        .iter()
        .map(|(field, change)| (field.to_string(), change.new_value().clone()))
        .collect()
}

/// Project the value before each change; `null` for create-only fields
pub fn old_attributes(record: &AuditRecord) -> Map<String, Value> {
    record
        .changes
        .iter()
        .map(|(field, change)| (field.to_string(), change.old_value().clone()))
        .collect()
}

/// Serialize a change set to its stored text form
pub fn encode(changes: &ChangeSet) -> AuditResult<String> {
    Ok(serde_json::to_string(changes)?)
}

/// Parse a change set from its stored text form
pub fn decode(text: &str) -> AuditResult<ChangeSet> {
    Ok(serde_json::from_str(text)?)
}
