//! Configuration module for revtrail
//!
//! This module provides configuration management including:
//! - Path resolution for the data directory
//! - User settings persistence
//! - The tracked-type schema file
//! - Atomic writes for both files

pub mod file_io;
pub mod paths;
pub mod schema;
pub mod settings;

pub use paths::TrailPaths;
pub use schema::SchemaConfig;
pub use settings::Settings;
