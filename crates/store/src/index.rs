//! Host name ownership index.
//!
//! Maps every reserved host name (primary names and listed domains) to the
//! managed domain that owns it. The catalog rebuilds it from a store scan
//! while holding the store lock, so it is never older than the records it
//! guards.

use std::collections::HashMap;

use mdreg_common::{DomainName, ManagedDomain};
use tracing::warn;

use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
pub struct DomainIndex {
    owners: HashMap<DomainName, DomainName>,
}

impl DomainIndex {
    /// Build the index from the given managed domains.
    pub fn build<'a, I>(mds: I) -> Self
    where
        I: IntoIterator<Item = &'a ManagedDomain>,
    {
        let mut index = Self::default();
        for md in mds {
            index.insert(md);
        }
        index
    }

    /// Record every name reserved by `md`.
    ///
    /// If a name is already owned by another managed domain (the store was
    /// edited behind our back), the first owner is kept.
    pub fn insert(&mut self, md: &ManagedDomain) {
        for host in md.reserved_names() {
            match self.owners.get(host) {
                Some(owner) if *owner != md.name => {
                    warn!(
                        domain = %host,
                        owner = %owner,
                        other = %md.name,
                        "Domain claimed by two managed domains"
                    );
                }
                Some(_) => {}
                None => {
                    self.owners.insert(host.clone(), md.name.clone());
                }
            }
        }
    }

    /// The managed domain that reserves `host`, if any
    pub fn owner(&self, host: &DomainName) -> Option<&DomainName> {
        self.owners.get(host)
    }

    /// Check that none of `hosts` is reserved by a managed domain other
    /// than `exclude`.
    pub fn check_available(
        &self,
        hosts: &[DomainName],
        exclude: Option<&DomainName>,
    ) -> Result<()> {
        for host in hosts {
            if let Some(owner) = self.owner(host) {
                if Some(owner) != exclude {
                    return Err(StoreError::Conflict {
                        domain: host.to_string(),
                        owner: owner.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
