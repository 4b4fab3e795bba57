//! Configuration for mdreg.
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file,
//! 3. `MDREG_*` environment variables,
//! 4. command line flags (applied by the binary).
//!
//! ```toml
//! store-dir = "/var/lib/mdreg"
//! lock-timeout-ms = 5000
//! json = false
//!
//! [ca]
//! url = "https://acme-v02.api.letsencrypt.org/directory"
//! proto = "ACME"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

pub mod validate;

pub use validate::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};

/// Prefix of the environment variables read by [`Config::apply_env`].
pub const ENV_PREFIX: &str = "MDREG_";

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid environment override: {0}")]
    Env(#[from] envy::Error),
}

/// Default CA settings for newly added managed domains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaDefaults {
    pub url: Option<String>,
    pub proto: Option<String>,
}

/// mdreg configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Storage root of the managed domain catalog
    pub store_dir: PathBuf,
    /// How long a mutation waits for the store lock
    pub lock_timeout_ms: u64,
    /// Render command output as JSON
    pub json: bool,
    pub ca: CaDefaults,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("/var/lib/mdreg")
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
            json: false,
            ca: CaDefaults::default(),
        }
    }
}

/// Environment overrides, e.g. `MDREG_STORE_DIR`
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    store_dir: Option<PathBuf>,
    lock_timeout_ms: Option<u64>,
    json: Option<bool>,
    ca_url: Option<String>,
    ca_proto: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Defaults, then the file if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()
    }

    /// Apply `MDREG_*` variables from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(std::env::vars())
    }

    /// Apply `MDREG_*` variables from the given pairs
    pub fn apply_env_from<I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        trace!(?overrides, "Applying environment overrides");

        if let Some(store_dir) = overrides.store_dir {
            self.store_dir = store_dir;
        }
        if let Some(timeout) = overrides.lock_timeout_ms {
            self.lock_timeout_ms = timeout;
        }
        if let Some(json) = overrides.json {
            self.json = json;
        }
        if let Some(url) = overrides.ca_url {
            self.ca.url = Some(url);
        }
        if let Some(proto) = overrides.ca_proto {
            self.ca.proto = Some(proto);
        }
        Ok(self)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Check the configuration, collecting errors and best-practice warnings
    pub fn validate(&self) -> ValidationResult {
        let mut result = validate::validate_config(self);
        result.merge(validate::lint::lint_config(self));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/mdreg"));
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
        assert_eq!(config.ca, CaDefaults::default());
        assert!(!config.json);
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            store-dir = "/srv/md"
            lock-timeout-ms = 250

            [ca]
            url = "https://acme.example/directory"
            "#,
        )
        .unwrap();

        assert_eq!(config.store_dir, PathBuf::from("/srv/md"));
        assert_eq!(config.lock_timeout_ms, 250);
        assert_eq!(
            config.ca.url.as_deref(),
            Some("https://acme.example/directory")
        );
        assert_eq!(config.ca.proto, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("lock-timeout-ms = 10").unwrap();
        assert_eq!(config.store_dir, default_store_dir());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::from_toml("store-directory = \"/x\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mdreg.toml");
        fs::write(&path, "store-dir = \"/tmp/md\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/tmp/md"));

        let missing = Config::from_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .apply_env_from(vars(&[
                ("MDREG_STORE_DIR", "/env/md"),
                ("MDREG_LOCK_TIMEOUT_MS", "42"),
                ("MDREG_CA_URL", "https://env.example/"),
                ("MDREG_CA_PROTO", "FOO"),
                ("MDREG_JSON", "true"),
                ("UNRELATED", "ignored"),
            ]))
            .unwrap();

        assert_eq!(config.store_dir, PathBuf::from("/env/md"));
        assert_eq!(config.lock_timeout_ms, 42);
        assert_eq!(config.ca.url.as_deref(), Some("https://env.example/"));
        assert_eq!(config.ca.proto.as_deref(), Some("FOO"));
        assert!(config.json);
    }

    #[test]
    fn test_env_bad_number() {
        let result =
            Config::default().apply_env_from(vars(&[("MDREG_LOCK_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    fn test_validate_combines_errors_and_lint() {
        let mut config = Config::default();
        config.ca.url = Some("no.schema/path".to_string());
        config.lock_timeout_ms = 0;

        let result = config.validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }
}
