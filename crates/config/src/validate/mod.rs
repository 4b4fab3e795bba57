//! Configuration validation
//!
//! Hard errors make the configuration unusable. Warnings come from
//! [`lint`] and flag settings that work but are likely mistakes.

use std::fmt;

use mdreg_common::ca;

use crate::Config;

pub mod lint;

/// Area of the configuration an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Storage,
    Ca,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Ca => write!(f, "ca"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ValidationError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub message: String,
}

impl ValidationWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Collected errors and warnings
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check settings that would make every catalog operation fail
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.store_dir.as_os_str().is_empty() {
        result.add_error(ValidationError::new(
            ErrorCategory::Storage,
            "store-dir must not be empty",
        ));
    }

    if let Some(ref url) = config.ca.url {
        if let Err(e) = ca::validate_url(url) {
            result.add_error(ValidationError::new(ErrorCategory::Ca, e.to_string()));
        }
    }

    if let Some(ref proto) = config.ca.proto {
        if proto.trim().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Ca,
                "ca.proto must not be empty",
            ));
        }
    }

    result
}
