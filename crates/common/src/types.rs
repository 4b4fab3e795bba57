//! The managed domain entity and its lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ca::CaReference;
use crate::names::DomainName;

/// Lifecycle state of a managed domain.
///
/// Serialized as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MdState {
    /// Configuration has been acted upon; nothing to do.
    #[default]
    Stable = 0,
    /// Configuration changed; certificate work is pending.
    Pending = 1,
}

impl MdState {
    /// Integer value as stored and rendered
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Status label used in reports
    pub fn label(self) -> &'static str {
        match self {
            MdState::Stable => "ok",
            MdState::Pending => "incomplete",
        }
    }

    /// Whether external renewal tooling has work to do
    pub fn needs_renewal(self) -> bool {
        matches!(self, MdState::Pending)
    }
}

impl From<MdState> for u8 {
    fn from(state: MdState) -> Self {
        state.as_u8()
    }
}

impl TryFrom<u8> for MdState {
    type Error = UnknownState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MdState::Stable),
            1 => Ok(MdState::Pending),
            other => Err(UnknownState(other)),
        }
    }
}

impl fmt::Display for MdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A stored state value this build does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle state {0}")]
pub struct UnknownState(pub u8);

/// A named group of host names sharing one certificate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedDomain {
    /// Primary name; the catalog key. Never changes after creation.
    pub name: DomainName,
    /// Host names covered, in display order, without duplicates.
    pub domains: Vec<DomainName>,
    /// Where certificates come from
    #[serde(default)]
    pub ca: CaReference,
    #[serde(default)]
    pub state: MdState,
}

impl ManagedDomain {
    /// Create a new managed domain in the stable state.
    ///
    /// `domains` is expected to come from
    /// [`validate_list`](crate::names::validate_list), with `name` its first
    /// entry.
    pub fn new(name: DomainName, domains: Vec<DomainName>, ca: CaReference) -> Self {
        Self {
            name,
            domains,
            ca,
            state: MdState::Stable,
        }
    }

    /// Whether `host` is listed in this managed domain
    pub fn contains_domain(&self, host: &DomainName) -> bool {
        self.domains.contains(host)
    }

    /// Every host name this managed domain reserves: its primary name and
    /// its domains.
    pub fn reserved_names(&self) -> impl Iterator<Item = &DomainName> {
        let others = self.domains.iter().filter(|d| **d != self.name);
        std::iter::once(&self.name).chain(others)
    }
}
