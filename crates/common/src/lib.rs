//! Common types for the mdreg managed domain registry.
//!
//! This crate has no I/O. It defines the managed domain entity and the pure
//! validation rules every other crate relies on:
//!
//! - [`names`]: host name validation and normalization
//! - [`ca`]: certificate authority references (URL + protocol label)
//! - [`types`]: [`ManagedDomain`] and its lifecycle [`MdState`]

pub mod ca;
pub mod errors;
pub mod names;
pub mod types;

pub use ca::{CaReference, DEFAULT_CA_PROTO};
pub use errors::{NameIssue, ValidationError};
pub use names::DomainName;
pub use types::{ManagedDomain, MdState};
