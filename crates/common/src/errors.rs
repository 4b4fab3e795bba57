//! Validation error types.

use std::fmt;
use thiserror::Error;

/// Why a single host name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameIssue {
    Empty,
    Whitespace,
    NonAscii,
    Wildcard,
    NoDot,
    TooLong,
    EmptyLabel,
    LabelTooLong,
    HyphenAtLabelEdge,
    InvalidCharacter(char),
}

impl fmt::Display for NameIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameIssue::Empty => write!(f, "name is empty"),
            NameIssue::Whitespace => write!(f, "name contains whitespace"),
            NameIssue::NonAscii => {
                write!(f, "name is not ASCII (encode IDNs as xn-- punycode)")
            }
            NameIssue::Wildcard => write!(f, "wildcard names are not supported"),
            NameIssue::NoDot => write!(f, "name must have at least two labels"),
            NameIssue::TooLong => write!(f, "name exceeds 253 characters"),
            NameIssue::EmptyLabel => write!(f, "name contains an empty label"),
            NameIssue::LabelTooLong => write!(f, "label exceeds 63 characters"),
            NameIssue::HyphenAtLabelEdge => write!(f, "label starts or ends with '-'"),
            NameIssue::InvalidCharacter(c) => write!(f, "invalid character {:?}", c),
        }
    }
}

/// Input rejected before it reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid domain name '{name}': {issue}")]
    InvalidName { name: String, issue: NameIssue },

    #[error("domain list is empty")]
    EmptyDomainList,

    #[error("invalid CA url '{url}': {reason}")]
    InvalidCaUrl { url: String, reason: String },

    #[error("CA protocol must not be empty")]
    EmptyCaProto,
}

impl ValidationError {
    pub(crate) fn name(name: &str, issue: NameIssue) -> Self {
        ValidationError::InvalidName {
            name: name.to_string(),
            issue,
        }
    }

    pub(crate) fn ca_url(url: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidCaUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
