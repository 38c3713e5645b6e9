//! Append-only JSONL record store
//!
//! Each record is written as a single JSON line and flushed immediately.
//! The store keeps one handle on the file and remembers how far it has read.
//! Before every append it takes the log's lock file and indexes whatever
//! other processes appended since, so the unique check sees every writer.
//! Lines are never rewritten or removed.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::models::{AuditRecord, EntityId, EntityRef, RequestId};

use super::index::RecordIndex;
use super::{lock, RecordStore, StoreError};

/// Record store persisted as line-delimited JSON
#[derive(Debug)]
pub struct JsonlStore {
    /// Path to the log file
    path: PathBuf,
    state: RwLock<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    index: RecordIndex,
    /// Bytes of the file already indexed; always just past a newline
    offset: u64,
    /// Lines already indexed, for error messages
    lines: usize,
    /// Read + append handle, opened on first use
    file: Option<File>,
}

impl JsonlStore {
    /// Open the store at `path`, loading any existing records
    ///
    /// A second record for the same entity and version means the log was
    /// written without coordination and is reported as a backend error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            state: RwLock::new(LogState::default()),
        };

        {
            let mut state = store.write_state()?;
            store.catch_up(&mut state)?;
            debug!(path = %store.path.display(), records = state.index.len(), "opened audit log");
        }

        Ok(store)
    }

    /// Get the path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the log file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn open_handle(&self, create: bool) -> Result<Option<File>, StoreError> {
        if create {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Backend(format!(
                            "Failed to create directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
        }

        match OpenOptions::new()
            .read(true)
            .append(true)
            .create(create)
            .open(&self.path)
        {
            Ok(file) => Ok(Some(file)),
            Err(e) if !create && e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("Failed to open audit log: {}", e))),
        }
    }

    /// Index complete lines appended since the last read
    ///
    /// Returns the number of trailing bytes that do not yet end in a newline.
    fn catch_up(&self, state: &mut LogState) -> Result<u64, StoreError> {
        if state.file.is_none() {
            state.file = self.open_handle(false)?;
        }
        let Some(file) = state.file.as_mut() else {
            return Ok(0);
        };

        let len = file
            .metadata()
            .map_err(|e| StoreError::Backend(format!("Failed to read audit log metadata: {}", e)))?
            .len();
        if len < state.offset {
            return Err(StoreError::Backend(format!(
                "Audit log {} shrank from {} to {} bytes",
                self.path.display(),
                state.offset,
                len
            )));
        }
        if len == state.offset {
            return Ok(0);
        }

        let mut buf = Vec::new();
        file.seek(SeekFrom::Start(state.offset))
            .and_then(|_| file.read_to_end(&mut buf))
            .map_err(|e| StoreError::Backend(format!("Failed to read audit log: {}", e)))?;

        let complete = buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);

        for raw in buf[..complete].split_inclusive(|&b| b == b'\n') {
            let line_num = state.lines + 1;
            let line = std::str::from_utf8(raw).map_err(|e| {
                StoreError::Backend(format!("Audit log line {} is not valid UTF-8: {}", line_num, e))
            })?;

            if !line.trim().is_empty() {
                let record: AuditRecord = serde_json::from_str(line).map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to parse audit record at line {}: {}",
                        line_num, e
                    ))
                })?;

                if state.index.check_unique(&record).is_err() {
                    return Err(StoreError::Backend(format!(
                        "Duplicate audit record at line {}: version {} of {} is already recorded",
                        line_num, record.version, record.auditable
                    )));
                }
                state.index.push(record);
            }

            state.lines = line_num;
            state.offset += raw.len() as u64;
        }

        Ok((buf.len() - complete) as u64)
    }

    fn append(&self, state: &mut LogState, record: &AuditRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize audit record: {}", e)))?;
        line.push('\n');

        if state.file.is_none() {
            state.file = self.open_handle(true)?;
        }
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| StoreError::Backend("Audit log handle unavailable".to_string()))?;

        file.write_all(line.as_bytes())
            .map_err(|e| StoreError::Backend(format!("Failed to write audit record: {}", e)))?;

        file.flush()
            .map_err(|e| StoreError::Backend(format!("Failed to flush audit log: {}", e)))?;

        state.offset += line.len() as u64;
        state.lines += 1;
        Ok(())
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, LogState>, StoreError> {
        self.state
            .write()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire write lock: {}", e)))
    }

    fn read<T>(&self, f: impl FnOnce(&RecordIndex) -> T) -> Result<T, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire read lock: {}", e)))?;
        Ok(f(&state.index))
    }
}

impl RecordStore for JsonlStore {
    fn insert(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let mut state = self.write_state()?;
        let _guard = lock::acquire(&self.path)?;

        let pending = self.catch_up(&mut state)?;
        if pending > 0 {
            // Nobody else is writing while we hold the lock, so this is a torn write
            return Err(StoreError::Backend(format!(
                "Audit log ends with an incomplete line after line {}",
                state.lines
            )));
        }

        state.index.check_unique(record)?;
        self.append(&mut state, record)?;
        state.index.push(record.clone());
        Ok(())
    }

    fn query_by_entity(&self, entity: &EntityRef) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.by_entity(entity))
    }

    fn max_version(&self, entity: &EntityRef) -> Result<Option<u32>, StoreError> {
        let mut state = self.write_state()?;
        self.catch_up(&mut state)?;
        Ok(state.index.max_version(entity))
    }

    fn query_destroyed_referencing(
        &self,
        entity_type: Option<&str>,
        field: &str,
        id: &EntityId,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.destroyed_referencing(entity_type, field, id))
    }

    fn query_associated(&self, associated: &EntityRef) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.by_associated(associated))
    }

    fn query_by_request(&self, request: RequestId) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.by_request(request))
    }

    fn all(&self) -> Result<Vec<AuditRecord>, StoreError> {
        self.read(|data| data.all())
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.read(|data| data.len())
    }
}
