//! mdreg store
//!
//! Persistent catalog of managed domains: named groups of host names that
//! share one certificate authority configuration.
//!
//! # Architecture
//!
//! - [`RecordStore`] - One JSON record per managed domain, replaced atomically
//! - [`StoreLock`] - Inter-process `flock` on the storage root for writers
//! - [`DomainIndex`] - Host name to owner mapping, rebuilt under the lock
//! - [`Catalog`] - Administrative API enforcing catalog-wide uniqueness
//! - [`Workflow`] - Same operations, plus lifecycle state bookkeeping
//!
//! # Example
//!
//! ```no_run
//! use mdreg_store::{MdUpdate, Workflow};
//!
//! # fn main() -> mdreg_store::Result<()> {
//! let workflow = Workflow::open("/var/lib/mdreg".as_ref())?;
//! workflow.add(["example.com", "www.example.com"], None, None)?;
//! let md = workflow.update("example.com", &MdUpdate::new().domains(["example.com"]))?;
//! assert!(md.state.needs_renewal());
//! # Ok(())
//! # }
//! ```

mod catalog;
mod error;
mod index;
mod lock;
mod storage;
mod workflow;

pub use catalog::{Catalog, MdUpdate};
pub use error::{ErrorKind, Result, StoreError};
pub use index::DomainIndex;
pub use lock::{StoreLock, DEFAULT_LOCK_TIMEOUT, LOCK_FILE};
pub use storage::{CorruptRecord, RecordStore, Scan, StoredRecord};
pub use workflow::Workflow;
