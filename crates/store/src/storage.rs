//! Managed domain record storage
//!
//! Persists one JSON document per managed domain under a storage root.
//!
//! # Directory Structure
//!
//! ```text
//! storage/
//! ├── store.lock            # Advisory lock held by writers
//! ├── generation            # Last write generation handed out
//! └── domains/
//!     └── example.com/
//!         └── md.json       # Managed domain record
//! ```
//!
//! Records are replaced atomically: the new document is written to a
//! temporary file next to `md.json`, synced, and renamed over it. Readers
//! take no lock and see either the old or the new record, never a torn one.
//! A writer killed mid-write leaves at most a stray temporary file, which
//! readers ignore.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mdreg_common::{DomainName, ManagedDomain};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::lock::StoreLock;

const DOMAINS_DIR: &str = "domains";
const RECORD_FILE: &str = "md.json";
const GENERATION_FILE: &str = "generation";

/// A managed domain as persisted, with its write bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub md: ManagedDomain,
    /// Monotonic write counter; higher means more recently created or modified
    #[serde(default)]
    pub generation: u64,
    /// When the record was last written
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

/// A record that exists on disk but cannot be read back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptRecord {
    pub name: String,
    pub reason: String,
}

/// Result of reading every record in the store
#[derive(Debug, Default)]
pub struct Scan {
    /// Readable records, most recently written first
    pub records: Vec<StoredRecord>,
    /// Records that failed to load
    pub corrupt: Vec<CorruptRecord>,
}

/// Managed domain record storage
///
/// Writes (`put`, `delete`) take a [`StoreLock`] reference so they can only
/// happen while the caller holds the root's lock.
#[derive(Debug)]
pub struct RecordStore {
    /// Base storage directory
    base_path: PathBuf,
}

impl RecordStore {
    /// Open the store at the given path, creating it on first use
    ///
    /// Directories are created with 0700 permissions on Unix.
    pub fn open(base_path: &Path) -> Result<Self> {
        let domains_path = base_path.join(DOMAINS_DIR);
        fs::create_dir_all(&domains_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(base_path, perms.clone())?;
            fs::set_permissions(&domains_path, perms)?;
        }

        debug!(
            storage_path = %base_path.display(),
            "Opened managed domain store"
        );

        Ok(Self {
            base_path: base_path.to_path_buf(),
        })
    }

    /// Get the storage base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Acquire the exclusive write lock for this store
    pub fn lock(&self, timeout: Duration) -> Result<StoreLock> {
        StoreLock::acquire(&self.base_path, timeout)
    }

    fn domains_path(&self) -> PathBuf {
        self.base_path.join(DOMAINS_DIR)
    }

    fn record_dir(&self, name: &DomainName) -> PathBuf {
        self.domains_path().join(name.as_str())
    }

    fn record_path(&self, name: &DomainName) -> PathBuf {
        self.record_dir(name).join(RECORD_FILE)
    }

    /// Check whether a record exists for `name`
    pub fn contains(&self, name: &DomainName) -> bool {
        self.record_path(name).exists()
    }

    /// Load a record with its bookkeeping
    pub fn load(&self, name: &DomainName) -> Result<StoredRecord> {
        let content = match read_record(&self.record_path(name)) {
            Ok(Some(content)) => content,
            Ok(None) => {
                trace!(name = %name, "No stored managed domain found");
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(reason) => {
                return Err(StoreError::Corrupt {
                    name: name.to_string(),
                    reason,
                })
            }
        };

        parse_record(name.as_str(), &content).map_err(|reason| StoreError::Corrupt {
            name: name.to_string(),
            reason,
        })
    }

    /// Load a managed domain
    pub fn get(&self, name: &DomainName) -> Result<ManagedDomain> {
        self.load(name).map(|record| record.md)
    }

    /// Write or replace the record for `md.name`
    ///
    /// Stamps the record with the next generation, so it sorts first in
    /// [`list`](Self::list).
    pub fn put(&self, lock: &StoreLock, md: &ManagedDomain) -> Result<StoredRecord> {
        let record_dir = self.record_dir(&md.name);
        fs::create_dir_all(&record_dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&record_dir, fs::Permissions::from_mode(0o700))?;
        }

        let record = StoredRecord {
            md: md.clone(),
            generation: self.next_generation(lock)?,
            modified: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&record)?;
        write_atomic(&record_dir.join(RECORD_FILE), &content)?;

        debug!(
            name = %md.name,
            generation = record.generation,
            domains = md.domains.len(),
            "Saved managed domain record"
        );

        Ok(record)
    }

    /// Delete the record for `name`
    pub fn delete(&self, _lock: &StoreLock, name: &DomainName) -> Result<()> {
        let record_path = self.record_path(name);

        match fs::remove_file(&record_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        // Readers skip a directory without a record, so the rest can go
        // in any order.
        let record_dir = self.record_dir(name);
        if let Err(e) = fs::remove_dir_all(&record_dir) {
            warn!(
                name = %name,
                error = %e,
                "Failed to clean up managed domain directory"
            );
        }

        debug!(name = %name, "Deleted managed domain record");
        Ok(())
    }

    /// Read every record, collecting unreadable ones separately
    ///
    /// A corrupt record never stops the scan.
    pub fn scan(&self) -> Result<Scan> {
        let domains_path = self.domains_path();
        let mut scan = Scan::default();

        if !domains_path.exists() {
            return Ok(scan);
        }

        for entry in fs::read_dir(&domains_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(dir_name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(entry = ?entry.file_name(), "Skipping non UTF-8 store entry");
                continue;
            };

            let parsed = match read_record(&entry.path().join(RECORD_FILE)) {
                Ok(Some(content)) => parse_record(&dir_name, &content),
                Ok(None) => {
                    trace!(name = %dir_name, "Skipping directory without record");
                    continue;
                }
                Err(reason) => Err(reason),
            };

            match parsed {
                Ok(record) => scan.records.push(record),
                Err(reason) => {
                    warn!(
                        name = %dir_name,
                        reason = %reason,
                        "Skipping corrupt managed domain record"
                    );
                    scan.corrupt.push(CorruptRecord {
                        name: dir_name,
                        reason,
                    });
                }
            }
        }

        scan.records.sort_by(|a, b| {
            b.generation
                .cmp(&a.generation)
                .then_with(|| b.modified.cmp(&a.modified))
                .then_with(|| a.md.name.cmp(&b.md.name))
        });

        trace!(
            records = scan.records.len(),
            corrupt = scan.corrupt.len(),
            "Scanned managed domain store"
        );
        Ok(scan)
    }

    /// List all readable managed domains, most recently written first
    pub fn list(&self) -> Result<Vec<ManagedDomain>> {
        Ok(self
            .scan()?
            .records
            .into_iter()
            .map(|record| record.md)
            .collect())
    }

    /// Hand out the next write generation
    fn next_generation(&self, _lock: &StoreLock) -> Result<u64> {
        let path = self.base_path.join(GENERATION_FILE);

        let current = match fs::read(&path) {
            Ok(content) => {
                let text = String::from_utf8_lossy(&content);
                match text.trim().parse::<u64>() {
                    Ok(n) => n,
                    Err(_) => {
                        warn!(
                            path = %path.display(),
                            "Unreadable generation counter, recomputing"
                        );
                        self.max_generation()?
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.max_generation()?,
            Err(e) => return Err(e.into()),
        };

        let next = current + 1;
        write_atomic(&path, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn max_generation(&self) -> Result<u64> {
        let scan = self.scan()?;
        Ok(scan.records.first().map(|r| r.generation).unwrap_or(0))
    }
}

/// Raw bytes of a record file, `None` if it does not exist
///
/// Any other failure is reported as the reason the record is unreadable.
fn read_record(path: &Path) -> std::result::Result<Option<Vec<u8>>, String> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("unreadable record: {}", e)),
    }
}

/// Parse a record and check it belongs under `dir_name`
fn parse_record(dir_name: &str, content: &[u8]) -> std::result::Result<StoredRecord, String> {
    let record: StoredRecord = serde_json::from_slice(content).map_err(|e| e.to_string())?;
    if record.md.name != dir_name {
        return Err(format!(
            "record names '{}' but is stored as '{}'",
            record.md.name, dir_name
        ));
    }
    if record.md.domains.is_empty() {
        return Err("record has no domains".to_string());
    }
    Ok(record)
}

/// Replace `path` with `data` so that readers never see a partial file
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    let temp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, Uuid::new_v4()));

    let written = (|| {
        let mut options = OpenOptions::new();
        options.create_new(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // Persist the rename itself.
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }

    Ok(())
}
