//! Configuration linting
//!
//! Settings that are accepted but probably not what the operator wants.

use super::{ValidationResult, ValidationWarning};
use crate::Config;

/// Lint configuration for likely mistakes
pub fn lint_config(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.lock_timeout_ms == 0 {
        result.add_warning(ValidationWarning::new(
            "lock-timeout-ms is 0, writers fail whenever another writer holds the lock",
        ));
    }

    if config.store_dir.is_relative() && !config.store_dir.as_os_str().is_empty() {
        result.add_warning(ValidationWarning::new(format!(
            "store-dir {:?} is relative and depends on the working directory",
            config.store_dir
        )));
    }

    match config.ca.url {
        None => {
            result.add_warning(ValidationWarning::new(
                "No default CA url, new managed domains have no CA until updated",
            ));
        }
        Some(ref url) if url.starts_with("http://") => {
            result.add_warning(ValidationWarning::new(format!(
                "CA url '{}' is not HTTPS",
                url
            )));
        }
        Some(_) => {}
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_warn_about_missing_ca() {
        let result = lint_config(&Config::default());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("No default CA"));
    }

    #[test]
    fn test_clean_config() {
        let mut config = Config::default();
        config.ca.url = Some("https://acme.example/directory".to_string());

        let result = lint_config(&config);
        assert!(result.warnings.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_all_warnings() {
        let mut config = Config {
            store_dir: PathBuf::from("md-store"),
            lock_timeout_ms: 0,
            ..Config::default()
        };
        config.ca.url = Some("http://acme.example/directory".to_string());

        let result = lint_config(&config);
        assert_eq!(result.warnings.len(), 3);
    }
}
