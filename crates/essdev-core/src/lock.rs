//! Advisory cross-process lock on a payload file.
//!
//! The lock lives on a sibling marker file (`<payload>.lock`) so the payload
//! itself can be replaced while the lock is held. Only processes that take
//! the same lock are excluded; a plain writer is not stopped.

use crate::error::{EssdevError, Result};
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const LOCK_SUFFIX: &str = ".lock";
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// `<path>.lock`, keeping the payload's own extension.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Exclusive lock held until dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Poll for an exclusive lock on `target`'s lock file until `timeout`.
    ///
    /// A timeout too large to represent as an `Instant` waits indefinitely.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let deadline = Instant::now().checked_add(timeout);
        loop {
            match file.try_lock() {
                Ok(()) => {
                    debug!(lock = %path.display(), "acquired payload lock");
                    return Ok(Self { file, path });
                }
                Err(TryLockError::WouldBlock) => {}
                Err(TryLockError::Error(e)) => return Err(e.into()),
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(EssdevError::LockTimeout { path, timeout });
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };
            debug!(lock = %path.display(), "payload lock busy, retrying");
            thread::sleep(pause);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = %self.path.display(), error = %e, "failed to release payload lock");
        }
    }
}
