//! File I/O utilities with atomic writes
//!
//! Config files are written to a sibling temp file and renamed into place, so
//! a crash leaves either the old file or the new one.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AuditError;

/// Temp file used while writing `path`: the same name with `.tmp` appended
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("revtrail"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write bytes to a file atomically (write to temp, then rename)
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<(), AuditError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AuditError::Io(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let result = write_synced(&temp_path, contents).and_then(|()| {
        fs::rename(&temp_path, path)
            .map_err(|e| AuditError::Io(format!("Failed to rename temp file: {}", e)))
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_synced(temp_path: &Path, contents: &[u8]) -> Result<(), AuditError> {
    let file = File::create(temp_path)
        .map_err(|e| AuditError::Io(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents)
        .and_then(|()| writer.flush())
        .map_err(|e| AuditError::Io(format!("Failed to write {}: {}", temp_path.display(), e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| AuditError::Io(format!("Failed to sync data: {}", e)))
}

/// Write pretty-printed JSON to a file atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), AuditError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let contents = serde_json::to_vec_pretty(data)
        .map_err(|e| AuditError::Config(format!("Failed to serialize data: {}", e)))?;
    write_atomic(path, &contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn test_data() -> TestData {
        TestData {
            name: "test".to_string(),
            value: 42,
        }
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        write_json_atomic(&path, &test_data()).unwrap();

        let loaded: TestData =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, test_data());
    }

    #[test]
    fn test_atomic_write_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schema.yaml");

        write_atomic(&path, b"types: []\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "types: []\n");
        assert!(!temp_dir.path().join("schema.yaml.tmp").exists());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("test.json");

        write_json_atomic(&path, &test_data()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_rename_keeps_target_and_removes_temp() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory can't be replaced by a file
        let path = temp_dir.path().join("config.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(write_json_atomic(&path, &test_data()).is_err());
        assert!(path.join("keep").exists());
        assert!(!temp_path_for(&path).exists());
    }
}
