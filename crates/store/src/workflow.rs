//! State-aware managed domain API.
//!
//! [`Workflow`] offers the same operations as [`Catalog`] but treats every
//! effective change to the domains or the CA reference of a managed domain
//! as configuration that still has to be acted upon: the managed domain is
//! moved to [`MdState::Pending`]. External renewal tooling calls
//! [`Workflow::mark_stable`] once it has obtained a matching certificate.
//!
//! ```text
//!         add()              update(domains|ca)
//!  [none] -----> [Stable] --------------------> [Pending]
//!                   ^                               |
//!                   |________ mark_stable() ________|
//! ```

use std::path::Path;

use mdreg_common::{ManagedDomain, MdState};

use crate::catalog::{Catalog, MdUpdate, StateRule};
use crate::error::Result;

/// State-aware managed domain API
#[derive(Debug, Clone)]
pub struct Workflow {
    catalog: Catalog,
}

impl Workflow {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Open (or create) the catalog stored at `root`
    pub fn open(root: &Path) -> Result<Self> {
        Ok(Self::new(Catalog::open(root)?))
    }

    /// The administrative API over the same store
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Create a managed domain; identical to [`Catalog::add`]
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
        self.catalog.add(hosts, ca_url, ca_proto)
    }

    pub fn list(&self) -> Result<Vec<ManagedDomain>> {
        self.catalog.list()
    }

    pub fn get(&self, name: &str) -> Result<ManagedDomain> {
        self.catalog.get(name)
    }

    pub fn remove(&self, name: &str, force: bool) -> Result<()> {
        self.catalog.remove(name, force)
    }

    /// Update a managed domain, flagging it for certificate work if its
    /// domains or CA reference change
    pub fn update(&self, name: &str, update: &MdUpdate) -> Result<ManagedDomain> {
        self.catalog
            .apply_update(name, update, StateRule::MarkPending)
    }

    /// Record that the pending work for a managed domain is done
    pub fn mark_stable(&self, name: &str) -> Result<ManagedDomain> {
        self.catalog.set_state(name, MdState::Stable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::fs;
    use tempfile::TempDir;

    const NAME1: &str = "greenbytes2.de";
    const NAME2: &str = "test-100.com";
    const ACME_URL: &str = "https://acme.example/directory";

    fn setup_workflow() -> (TempDir, Workflow) {
        let temp_dir = TempDir::new().unwrap();
        let workflow = Workflow::open(temp_dir.path()).unwrap();
        workflow
            .add(
                [NAME1, "www.greenbytes2.de", "mail.greenbytes2.de"],
                Some(ACME_URL),
                None,
            )
            .unwrap();
        workflow
            .add(
                [NAME2, "test-101.com", "test-102.com"],
                Some(ACME_URL),
                None,
            )
            .unwrap();
        (temp_dir, workflow)
    }

    #[test]
    fn test_update_domains_marks_pending() {
        let (_temp_dir, workflow) = setup_workflow();

        let md = workflow
            .update(NAME1, &MdUpdate::new().domains(["foo.de", "bar.de"]))
            .unwrap();
        assert_eq!(md.name, NAME1);
        assert_eq!(md.domains, ["foo.de", "bar.de"]);
        assert_eq!(md.ca.url(), Some(ACME_URL));
        assert_eq!(md.ca.proto(), "ACME");
        assert_eq!(md.state, MdState::Pending);

        assert_eq!(workflow.list().unwrap()[0], md);
    }

    #[test]
    fn test_update_ca_marks_pending() {
        let (_temp_dir, workflow) = setup_workflow();

        let md = workflow
            .update(NAME1, &MdUpdate::new().ca_url("http://localhost.com:9999"))
            .unwrap();
        assert_eq!(md.ca.url(), Some("http://localhost.com:9999"));
        assert_eq!(md.state, MdState::Pending);

        let md = workflow
            .update(NAME2, &MdUpdate::new().ca_url(ACME_URL).ca_proto("FOO"))
            .unwrap();
        assert_eq!(md.ca.proto(), "FOO");
        assert_eq!(md.state, MdState::Pending);
    }

    fn record_bytes(temp_dir: &TempDir, name: &str) -> Vec<u8> {
        let path = temp_dir.path().join("domains").join(name);
        fs::read(path.join("md.json")).unwrap()
    }

    #[test]
    fn test_null_update_keeps_state() {
        let (temp_dir, workflow) = setup_workflow();
        let before = record_bytes(&temp_dir, NAME1);

        let md = workflow.update(NAME1, &MdUpdate::new()).unwrap();
        assert_eq!(md.state, MdState::Stable);
        assert_eq!(record_bytes(&temp_dir, NAME1), before);

        // Same values as stored is not a change either.
        let md = workflow
            .update(NAME1, &MdUpdate::new().ca_url(ACME_URL))
            .unwrap();
        assert_eq!(md.state, MdState::Stable);
        assert_eq!(record_bytes(&temp_dir, NAME1), before);
    }

    #[test]
    fn test_overlapping_update_rejected() {
        let (_temp_dir, workflow) = setup_workflow();

        let err = workflow
            .update(NAME1, &MdUpdate::new().domains([NAME1, NAME2]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let md = workflow.get(NAME1).unwrap();
        assert_eq!(md.domains.len(), 3);
        assert_eq!(md.state, MdState::Stable);
    }

    #[test]
    fn test_mark_stable_closes_cycle() {
        let (_temp_dir, workflow) = setup_workflow();

        workflow
            .update(NAME1, &MdUpdate::new().domains(["foo.de"]))
            .unwrap();
        let md = workflow.mark_stable(NAME1).unwrap();
        assert_eq!(md.state, MdState::Stable);
        assert_eq!(md.domains, ["foo.de"]);

        let md = workflow
            .update(NAME1, &MdUpdate::new().domains(["bar.de"]))
            .unwrap();
        assert_eq!(md.state, MdState::Pending);
    }

    #[test]
    fn test_raw_update_after_workflow_update_keeps_pending() {
        let (_temp_dir, workflow) = setup_workflow();

        workflow
            .update(NAME1, &MdUpdate::new().domains(["foo.de"]))
            .unwrap();
        let md = workflow
            .catalog()
            .update(NAME1, &MdUpdate::new().domains(["bar.de"]))
            .unwrap();
        assert_eq!(md.state, MdState::Pending);
    }
}
