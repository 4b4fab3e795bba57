//! Host name validation and normalization.
//!
//! Every host name that enters the registry goes through [`validate`]. The
//! result is a [`DomainName`]: lowercase ASCII, at least two labels, no
//! wildcard and no trailing root dot. IDNs must be supplied in their
//! `xn--` punycode form; raw non-ASCII input is rejected.
//!
//! Uniqueness across managed domains is not checked here. That needs the
//! rest of the catalog and belongs to the store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::errors::{NameIssue, ValidationError};

/// Maximum length of a host name in presentation form, without the root dot.
pub const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

/// A validated, normalized host name.
///
/// Only obtainable through [`validate`] (or deserialization, which runs the
/// same checks), so holding one means the name is well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate(&s)
    }
}

impl TryFrom<&str> for DomainName {
    type Error = ValidationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        validate(s)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

impl PartialEq<str> for DomainName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DomainName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for DomainName {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

/// Validate and normalize a single host name.
pub fn validate(name: &str) -> Result<DomainName, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::name(name, NameIssue::Empty));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::name(name, NameIssue::Whitespace));
    }
    if !name.is_ascii() {
        return Err(ValidationError::name(name, NameIssue::NonAscii));
    }
    if name == "*" || name.starts_with("*.") {
        return Err(ValidationError::name(name, NameIssue::Wildcard));
    }

    // A single trailing root dot names the same host.
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(ValidationError::name(name, NameIssue::Empty));
    }
    if !trimmed.contains('.') {
        return Err(ValidationError::name(name, NameIssue::NoDot));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(ValidationError::name(name, NameIssue::TooLong));
    }

    for label in trimmed.split('.') {
        check_label(name, label)?;
    }

    Ok(DomainName(trimmed.to_ascii_lowercase()))
}

fn check_label(name: &str, label: &str) -> Result<(), ValidationError> {
    if label.is_empty() {
        return Err(ValidationError::name(name, NameIssue::EmptyLabel));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(ValidationError::name(name, NameIssue::LabelTooLong));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
    {
        return Err(ValidationError::name(name, NameIssue::InvalidCharacter(c)));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::name(name, NameIssue::HyphenAtLabelEdge));
    }
    Ok(())
}

/// Validate a list of host names.
///
/// Duplicates (after normalization) are dropped, keeping the first
/// occurrence. Fails if any name is invalid or nothing is left.
pub fn validate_list<I, S>(names: I) -> Result<Vec<DomainName>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for name in names {
        let normalized = validate(name.as_ref())?;
        if seen.insert(normalized.clone()) {
            result.push(normalized);
        }
    }

    if result.is_empty() {
        return Err(ValidationError::EmptyDomainList);
    }
    Ok(result)
}
