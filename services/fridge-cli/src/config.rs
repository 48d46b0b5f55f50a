//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is never read from the config file; it comes from the
//! FRIDGE_PASSWORD env var at login time.

use fridge_auth::NoAuthPaths;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// API connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on one call to the refresh endpoint
    #[serde(default = "default_renewal_timeout")]
    pub renewal_timeout_secs: u64,
}

/// Credential file location
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub credentials_path: PathBuf,
}

/// Extra endpoints to call without a bearer token
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub extra_no_auth_paths: Vec<String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_renewal_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// FRIDGE_BASE_URL replaces `api.base_url` when set.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("FRIDGE_BASE_URL") {
            config.api.base_url = url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.api.renewal_timeout_secs == 0 {
            return Err(common::Error::Config(
                "renewal_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("fridge.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn renewal_timeout(&self) -> Duration {
        Duration::from_secs(self.api.renewal_timeout_secs)
    }

    /// Default No-Auth endpoints plus any configured extras.
    pub fn no_auth_paths(&self) -> NoAuthPaths {
        NoAuthPaths::default().extend(self.auth.extra_no_auth_paths.iter().cloned())
    }
}
