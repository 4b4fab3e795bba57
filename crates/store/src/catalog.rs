//! Administrative managed domain catalog.
//!
//! [`Catalog`] is the raw store API: it validates input, enforces the
//! catalog-wide invariants and persists, but never touches the lifecycle
//! state of a managed domain on update. The state-aware API lives in
//! [`Workflow`](crate::Workflow), which shares this implementation.
//!
//! Invariants kept by every successful call:
//!
//! - managed domain names are unique,
//! - no host name is reserved by two managed domains (a primary name counts
//!   as reserved even if it is no longer listed in its own domains),
//! - `domains` is never empty and has no duplicates.
//!
//! Mutations hold the store lock from the first read to the final write, so
//! two processes cannot interleave their checks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mdreg_common::names;
use mdreg_common::{CaReference, ManagedDomain, MdState};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::index::DomainIndex;
use crate::lock::{StoreLock, DEFAULT_LOCK_TIMEOUT};
use crate::storage::{RecordStore, Scan};

/// Fields to change in an update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MdUpdate {
    pub domains: Option<Vec<String>>,
    pub ca_url: Option<String>,
    pub ca_proto: Option<String>,
}

impl MdUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    pub fn ca_url(mut self, url: impl Into<String>) -> Self {
        self.ca_url = Some(url.into());
        self
    }

    pub fn ca_proto(mut self, proto: impl Into<String>) -> Self {
        self.ca_proto = Some(proto.into());
        self
    }

    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        self.domains.is_none() && self.ca_url.is_none() && self.ca_proto.is_none()
    }
}

/// What an update does to the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateRule {
    Preserve,
    MarkPending,
}

/// Administrative managed domain catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    store: Arc<RecordStore>,
    lock_timeout: Duration,
}

impl Catalog {
    /// Open (or create) the catalog stored at `root`
    pub fn open(root: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(RecordStore::open(root)?)))
    }

    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set how long mutations wait for the store lock
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn lock(&self) -> Result<StoreLock> {
        self.store.lock(self.lock_timeout)
    }

    /// Build the ownership index from the current records
    fn index(&self, scan: &Scan) -> DomainIndex {
        DomainIndex::build(scan.records.iter().map(|record| &record.md))
    }

    /// Create a managed domain
    ///
    /// The first name becomes the managed domain's name. Fails if that name
    /// exists or if any of the names is already reserved elsewhere.
    pub fn add<I, S>(
        &self,
        hosts: I,
        ca_url: Option<&str>,
        ca_proto: Option<&str>,
    ) -> Result<ManagedDomain>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = names::validate_list(hosts)?;
        let ca = CaReference::parse(ca_url, ca_proto)?;
        let name = domains[0].clone();

        let lock = self.lock()?;

        if self.store.contains(&name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let scan = self.store.scan()?;
        self.index(&scan).check_available(&domains, None)?;

        let md = ManagedDomain::new(name, domains, ca);
        self.store.put(&lock, &md)?;

        info!(
            name = %md.name,
            domains = md.domains.len(),
            ca_url = ?md.ca.url(),
            "Added managed domain"
        );
        Ok(md)
    }

    /// All readable managed domains, most recently created or modified first
    pub fn list(&self) -> Result<Vec<ManagedDomain>> {
        self.store.list()
    }

    /// Every record, including the ones that failed to load
    pub fn scan(&self) -> Result<Scan> {
        self.store.scan()
    }

    /// Look up a managed domain by name
    pub fn get(&self, name: &str) -> Result<ManagedDomain> {
        self.store.get(&names::validate(name)?)
    }

    /// Find the managed domain that reserves `host`
    pub fn find_by_domain(&self, host: &str) -> Result<Option<ManagedDomain>> {
        let host = names::validate(host)?;
        Ok(self
            .store
            .list()?
            .into_iter()
            .find(|md| md.name == host || md.contains_domain(&host)))
    }

    /// Remove a managed domain
    ///
    /// With `force`, removing a managed domain that does not exist succeeds.
    pub fn remove(&self, name: &str, force: bool) -> Result<()> {
        let name = names::validate(name)?;
        let lock = self.lock()?;

        match self.store.delete(&lock, &name) {
            Ok(()) => {
                info!(name = %name, "Removed managed domain");
                Ok(())
            }
            Err(StoreError::NotFound(_)) if force => {
                debug!(name = %name, "Managed domain to remove not found, ignoring");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Update a managed domain without touching its lifecycle state
    pub fn update(&self, name: &str, update: &MdUpdate) -> Result<ManagedDomain> {
        self.apply_update(name, update, StateRule::Preserve)
    }

    pub(crate) fn apply_update(
        &self,
        name: &str,
        update: &MdUpdate,
        rule: StateRule,
    ) -> Result<ManagedDomain> {
        let name = names::validate(name)?;

        if update.is_empty() {
            debug!(name = %name, "Empty update, nothing to change");
            return self.store.get(&name);
        }

        let domains = update
            .domains
            .as_ref()
            .map(names::validate_list)
            .transpose()?;

        let lock = self.lock()?;
        let current = self.store.get(&name)?;
        let mut next = current.clone();

        if let Some(domains) = domains {
            let scan = self.store.scan()?;
            self.index(&scan).check_available(&domains, Some(&name))?;
            next.domains = domains;
        }
        next.ca = current
            .ca
            .with_update(update.ca_url.as_deref(), update.ca_proto.as_deref())?;

        if next == current {
            debug!(
                name = %name,
                "Update matches stored managed domain, nothing to write"
            );
            return Ok(current);
        }

        if rule == StateRule::MarkPending {
            next.state = MdState::Pending;
        }

        self.store.put(&lock, &next)?;

        info!(
            name = %next.name,
            domains = next.domains.len(),
            ca_url = ?next.ca.url(),
            state = next.state.as_u8(),
            "Updated managed domain"
        );
        Ok(next)
    }

    /// Set the lifecycle state of a managed domain
    pub(crate) fn set_state(&self, name: &str, state: MdState) -> Result<ManagedDomain> {
        let name = names::validate(name)?;
        let lock = self.lock()?;
        let mut md = self.store.get(&name)?;

        if md.state == state {
            return Ok(md);
        }
        md.state = state;
        self.store.put(&lock, &md)?;

        info!(
            name = %md.name,
            state = state.as_u8(),
            "Changed managed domain state"
        );
        Ok(md)
    }
}
