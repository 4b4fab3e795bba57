//! Inter-process lock on a storage root.
//!
//! Every mutation of the store runs while holding an exclusive advisory
//! `flock(2)` on `<root>/store.lock`. The lock is an RAII guard: dropping
//! [`StoreLock`] releases it, and the kernel releases it if the process
//! dies, so a crashed writer never leaves the store locked.
//!
//! Acquisition never blocks indefinitely. It polls with a non-blocking
//! request and exponential backoff until the configured timeout, then
//! fails with [`StoreError::LockTimeout`], which callers may retry.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, trace, warn};

use crate::error::{Result, StoreError};

/// Name of the lock file inside the storage root.
pub const LOCK_FILE: &str = "store.lock";

/// Default time to wait for the lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// First retry delay.
const BACKOFF_BASE: Duration = Duration::from_millis(5);

/// Upper bound on a single retry delay.
const BACKOFF_MAX: Duration = Duration::from_millis(200);

/// Exclusive lock on a storage root, held until dropped.
pub struct StoreLock {
    _guard: Flock<File>,
    path: PathBuf,
    acquired_at: Instant,
}

impl StoreLock {
    /// Acquire the lock for `root`, waiting at most `timeout`.
    pub fn acquire(root: &Path, timeout: Duration) -> Result<Self> {
        let path = root.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let start = Instant::now();
        let mut backoff = BACKOFF_BASE;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(guard) => {
                    debug!(
                        lock = %path.display(),
                        attempts,
                        waited_ms = start.elapsed().as_millis() as u64,
                        "Acquired store lock"
                    );
                    return Ok(Self {
                        _guard: guard,
                        path,
                        acquired_at: Instant::now(),
                    });
                }
                Err((returned, errno))
                    if errno == Errno::EWOULDBLOCK || errno == Errno::EINTR =>
                {
                    file = returned;
                }
                Err((_, errno)) => return Err(StoreError::Io(errno.into())),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                warn!(
                    lock = %path.display(),
                    attempts,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for store lock"
                );
                return Err(StoreError::LockTimeout { path, timeout });
            }

            let delay = backoff.min(timeout - elapsed);
            trace!(
                lock = %path.display(),
                delay_ms = delay.as_millis() as u64,
                "Store lock busy"
            );
            thread::sleep(delay);
            backoff = (backoff * 2).min(BACKOFF_MAX);
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        trace!(
            lock = %self.path.display(),
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Releasing store lock"
        );
    }
}

impl fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLock")
            .field("path", &self.path)
            .field("held_for", &self.acquired_at.elapsed())
            .finish()
    }
}
