//! Cross-process write lock for the audit log
//!
//! A sibling `<log>.lock` file created with `create_new` marks the writer;
//! it holds the owner's pid so a lock left behind by a dead process can be
//! reclaimed.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::StoreError;

const LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Removes the lock file when dropped
#[derive(Debug)]
pub struct WriteLockGuard {
    path: PathBuf,
}

impl Drop for WriteLockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[derive(Debug)]
enum LockState {
    HeldBy(u32),
    Stale,
    Unknown,
}

/// Path of the lock file guarding `log_path`
pub fn lock_path_for(log_path: &Path) -> PathBuf {
    let mut name = log_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Block until the lock beside `log_path` is ours
pub fn acquire(log_path: &Path) -> Result<WriteLockGuard, StoreError> {
    let lock_path = lock_path_for(log_path);
    let started = Instant::now();

    loop {
        match try_acquire(&lock_path) {
            Ok(guard) => return Ok(guard),
            Err(LockState::Stale) => {
                warn!(path = %lock_path.display(), "removing stale audit log lock");
                let _ = std::fs::remove_file(&lock_path);
            }
            Err(state) => {
                if started.elapsed() >= LOCK_WAIT_TIMEOUT {
                    let holder = match state {
                        LockState::HeldBy(pid) => format!("held by pid {}", pid),
                        _ => "remove it if no revtrail process is running".to_string(),
                    };
                    return Err(StoreError::Backend(format!(
                        "Timed out waiting for audit log lock {} ({})",
                        lock_path.display(),
                        holder
                    )));
                }
                std::thread::sleep(LOCK_RETRY_DELAY);
            }
        }
    }
}

fn try_acquire(lock_path: &Path) -> Result<WriteLockGuard, LockState> {
    if let Some(parent) = lock_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(lock_path)
    {
        Ok(mut file) => {
            let _ = writeln!(file, "{}", std::process::id());
            debug!(path = %lock_path.display(), "acquired audit log lock");
            Ok(WriteLockGuard {
                path: lock_path.to_path_buf(),
            })
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            let mut pid_buf = String::new();
            if OpenOptions::new()
                .read(true)
                .open(lock_path)
                .and_then(|mut file| file.read_to_string(&mut pid_buf))
                .is_err()
            {
                return Err(LockState::Unknown);
            }

            // An empty file means the holder has not written its pid yet
            match pid_buf.trim().parse::<u32>().ok() {
                Some(pid) if is_process_running(pid) => Err(LockState::HeldBy(pid)),
                Some(_) => Err(LockState::Stale),
                None => Err(LockState::Unknown),
            }
        }
        Err(_) => Err(LockState::Unknown),
    }
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquires_and_releases_lock_file() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("audits.jsonl");
        let lock = lock_path_for(&log);
        assert_eq!(lock, temp.path().join("audits.jsonl.lock"));

        let guard = acquire(&log).unwrap();
        assert!(lock.is_file());
        assert!(matches!(try_acquire(&lock), Err(LockState::HeldBy(_))));

        drop(guard);
        assert!(!lock.exists());
    }

    #[test]
    fn test_waits_for_holder_in_another_thread() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("audits.jsonl");
        let guard = acquire(&log).unwrap();

        let waiter = {
            let log = log.clone();
            std::thread::spawn(move || acquire(&log).map(drop))
        };
        std::thread::sleep(Duration::from_millis(60));
        drop(guard);

        assert!(waiter.join().unwrap().is_ok());
        assert!(!lock_path_for(&log).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_lock_reclaimed() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("audits.jsonl");
        // pid_max on Linux is at most 2^22, so this pid cannot be alive
        std::fs::write(lock_path_for(&log), "999999999\n").unwrap();

        let guard = acquire(&log).unwrap();
        let owner = std::fs::read_to_string(lock_path_for(&log)).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
        drop(guard);
    }
}
