//! Configuration for query objects.
//!
//! Pagination defaults are read from the optional `config/config.toml`
//! (section `[query]`) and from `LIFEQUERY__`-prefixed environment variables,
//! e.g. `LIFEQUERY__QUERY__PAGINATION__UPPER=50`.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::Deserialize;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "LIFEQUERY";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct QueryConfig {
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Page-size bounds used by `paginate` filters that do not set their own.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    #[serde(default = "default_lower")]
    pub lower: u64,
    #[serde(default = "default_upper")]
    pub upper: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            lower: default_lower(),
            upper: default_upper(),
        }
    }
}

fn default_limit() -> u64 {
    20
}

fn default_lower() -> u64 {
    1
}

fn default_upper() -> u64 {
    100
}

static SETTINGS: Lazy<QueryConfig> = Lazy::new(|| match QueryConfig::load() {
    Ok(cfg) => cfg,
    Err(err) => {
        log::warn!("Failed to load query configuration, using defaults: {}", err);
        QueryConfig::default()
    }
});

/// Process-wide configuration, loaded once on first use.
pub fn settings() -> &'static QueryConfig {
    &SETTINGS
}

impl QueryConfig {
    /// Load the query configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // The file exists but is unreadable: retry with env only
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!(
                        "Failed to load config file, falling back to env. Error: {}",
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_config(&settings)
    }

    /// Extract the `query` section; a missing section yields the defaults.
    pub fn from_config(settings: &Config) -> Result<Self, ConfigError> {
        let query_config = match settings.get::<QueryConfig>("query") {
            Ok(cfg) => cfg,
            Err(ConfigError::NotFound(_)) => QueryConfig::default(),
            Err(e) => {
                return Err(ConfigError::Message(format!(
                    "Query configuration could not be loaded from file or environment: {}",
                    e
                )))
            }
        };

        query_config.pagination.validate()?;
        Ok(query_config)
    }
}

impl PaginationConfig {
    /// Bounds must be ordered and non-zero; the default page size must lie inside them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lower == 0 || self.lower > self.upper {
            return Err(ConfigError::Message(format!(
                "pagination bounds must satisfy 0 < lower <= upper (lower = {}, upper = {})",
                self.lower, self.upper
            )));
        }
        if self.default_limit < self.lower || self.default_limit > self.upper {
            return Err(ConfigError::Message(format!(
                "pagination default_limit {} is outside [{}, {}]",
                self.default_limit, self.lower, self.upper
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<QueryConfig, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        QueryConfig::from_config(&settings)
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let cfg = from_toml("[database]\nurl = \"postgres://localhost\"\n").unwrap();
        assert_eq!(cfg, QueryConfig::default());
        assert_eq!(cfg.pagination.default_limit, 20);
        assert_eq!(cfg.pagination.lower, 1);
        assert_eq!(cfg.pagination.upper, 100);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let cfg = from_toml("[query.pagination]\nupper = 50\n").unwrap();
        assert_eq!(cfg.pagination.upper, 50);
        assert_eq!(cfg.pagination.lower, 1);
        assert_eq!(cfg.pagination.default_limit, 20);
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let err = from_toml("[query.pagination]\nlower = 10\nupper = 5\n").unwrap_err();
        assert!(err.to_string().contains("lower <= upper"));
    }

    #[test]
    fn test_default_limit_outside_bounds_is_rejected() {
        let err = from_toml("[query.pagination]\ndefault_limit = 500\n").unwrap_err();
        assert!(err.to_string().contains("outside"));
    }
}
