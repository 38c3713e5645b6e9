//! Path management for revtrail
//!
//! ## Path Resolution Order
//!
//! 1. `REVTRAIL_DATA_DIR` environment variable (if set)
//! 2. The platform config directory (`~/.config/revtrail` on Linux,
//!    `~/Library/Application Support/revtrail` on macOS, `%APPDATA%\revtrail`
//!    on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::AuditError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "REVTRAIL_DATA_DIR";

/// Manages all paths used by revtrail
#[derive(Debug, Clone)]
pub struct TrailPaths {
    base_dir: PathBuf,
}

impl TrailPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, AuditError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "revtrail")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    AuditError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Create TrailPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the append-only audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audits.jsonl")
    }

    /// Get the path to the tracked-type schema
    pub fn schema_file(&self) -> PathBuf {
        self.base_dir.join("schema.yaml")
    }

    pub fn ensure_directories(&self) -> Result<(), AuditError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| AuditError::Io(format!("Failed to create base directory: {}", e)))
    }

    /// Check if revtrail has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}
