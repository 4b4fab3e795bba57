//! Certificate authority references.
//!
//! A [`CaReference`] names the CA endpoint a managed domain obtains its
//! certificates from, plus an opaque protocol label. The URL is optional
//! (absent means "not configured") and, when present, is kept exactly as
//! supplied once it has been checked.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ValidationError;

/// Protocol label used when none is given at creation.
pub const DEFAULT_CA_PROTO: &str = "ACME";

fn default_proto() -> String {
    DEFAULT_CA_PROTO.to_string()
}

/// CA endpoint and protocol label of a managed domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default = "default_proto")]
    proto: String,
}

impl Default for CaReference {
    fn default() -> Self {
        Self {
            url: None,
            proto: default_proto(),
        }
    }
}

impl CaReference {
    /// Build a reference from optional user input.
    ///
    /// `proto` defaults to [`DEFAULT_CA_PROTO`].
    pub fn parse(url: Option<&str>, proto: Option<&str>) -> Result<Self, ValidationError> {
        Self::default().with_update(url, proto)
    }

    /// Return a copy with the given parts replaced.
    ///
    /// Omitted parts keep their current value.
    pub fn with_update(
        &self,
        url: Option<&str>,
        proto: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let url = match url {
            Some(url) => Some(validate_url(url)?),
            None => self.url.clone(),
        };
        let proto = match proto {
            Some(proto) => validate_proto(proto)?,
            None => self.proto.clone(),
        };
        Ok(Self { url, proto })
    }

    /// The CA endpoint, if one is configured
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The protocol label
    pub fn proto(&self) -> &str {
        &self.proto
    }
}

/// Check that `url` is an absolute URL with a scheme and a host.
///
/// Returns the input unchanged on success.
pub fn validate_url(url: &str) -> Result<String, ValidationError> {
    // The parser silently strips some whitespace, so check the raw input.
    if url.chars().any(char::is_whitespace) {
        return Err(ValidationError::ca_url(url, "contains whitespace"));
    }

    let parsed = Url::parse(url).map_err(|e| ValidationError::ca_url(url, e.to_string()))?;

    if parsed.cannot_be_a_base() {
        return Err(ValidationError::ca_url(url, "not a hierarchical URL"));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(ValidationError::ca_url(url, "missing host")),
    }

    Ok(url.to_string())
}

fn validate_proto(proto: &str) -> Result<String, ValidationError> {
    if proto.trim().is_empty() {
        return Err(ValidationError::EmptyCaProto);
    }
    Ok(proto.to_string())
}
