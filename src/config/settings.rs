//! User settings for revtrail
//!
//! Controls the attribution fallback, version-race retries and how
//! timestamps are shown.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use super::file_io::write_json_atomic;
use super::paths::TrailPaths;
use crate::error::AuditError;

/// User settings for revtrail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Name shown when a record has no resolvable actor
    #[serde(default = "default_actor")]
    pub default_actor: String,

    /// How many times a lost version race is retried before failing
    #[serde(default = "default_version_retries")]
    pub version_retries: u32,

    /// strftime format used when displaying record timestamps
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_actor() -> String {
    "System".to_string()
}

fn default_version_retries() -> u32 {
    1
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_actor: default_actor(),
            version_retries: default_version_retries(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &TrailPaths) -> Result<Self, AuditError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| AuditError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                AuditError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Caller decides when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &TrailPaths) -> Result<(), AuditError> {
        paths.ensure_directories()?;

        self.validate()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Reject settings the display layer cannot use
    pub fn validate(&self) -> Result<(), AuditError> {
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(AuditError::Config(format!(
                "Invalid timestamp_format {:?}: not a valid strftime format",
                self.timestamp_format
            )));
        }
        Ok(())
    }
}
