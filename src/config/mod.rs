//! Configuration for fetchbin
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. A TOML file: `--config PATH`, else `$FETCHBIN_CONFIG`, else
//!    `<config dir>/fetchbin/config.toml` (e.g. `~/.config/fetchbin/config.toml`).
//!    Only the default location may be absent.
//! 2. Environment variables (`FETCHBIN_BASE_URL`, `FETCHBIN_NAME`,
//!    `FETCHBIN_INSTALL_DIR`, `FETCHBIN_LINK_DIR`, `FETCHBIN_TIMEOUT`).
//! 3. Command-line flags, applied by the CLI.
//!
//! # Example
//!
//! ```toml
//! artifact_name = "tool"
//! release_base_url = "https://github.com/acme/tool/releases/download"
//! install_dir = "~/.local/share/tool/bin"
//! link_dir = "~/.local/bin"
//! checksums = "release"
//! timeout_secs = 300
//! read_timeout_secs = 30
//! max_attempts = 3
//! ```
//!
//! Environment lookups go through a caller-supplied function so tests never
//! have to mutate the process environment.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::constants::{
    CONNECT_TIMEOUT, MAX_BACKOFF_DELAY_MS, MAX_FETCH_ATTEMPTS, MAX_REDIRECTS, READ_TIMEOUT,
    STARTING_BACKOFF_DELAY_MS, default_overall_timeout,
};
use crate::core::FetchbinError;
use crate::fetcher::{FetchOptions, RetryPolicy};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FETCHBIN_CONFIG";
pub const BASE_URL_ENV: &str = "FETCHBIN_BASE_URL";
pub const NAME_ENV: &str = "FETCHBIN_NAME";
pub const INSTALL_DIR_ENV: &str = "FETCHBIN_INSTALL_DIR";
pub const LINK_DIR_ENV: &str = "FETCHBIN_LINK_DIR";
pub const TIMEOUT_ENV: &str = "FETCHBIN_TIMEOUT";

/// Persistent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the artifact to install
    pub artifact_name: Option<String>,
    /// Base URL of the release host
    pub release_base_url: Option<String>,
    /// Directory receiving the executable; `./bin` when unset
    pub install_dir: Option<String>,
    /// Directory on the command path to link into
    pub link_dir: Option<String>,
    /// `release`, `none`, or the path of a checksum manifest
    pub checksums: Option<String>,
    /// Overall timeout for download and verification
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Longest silence from the server before an attempt is retried
    pub read_timeout_secs: u64,
    pub max_attempts: usize,
    pub max_redirects: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_name: None,
            release_base_url: None,
            install_dir: None,
            link_dir: None,
            checksums: None,
            timeout_secs: default_overall_timeout().as_secs(),
            connect_timeout_secs: CONNECT_TIMEOUT.as_secs(),
            read_timeout_secs: READ_TIMEOUT.as_secs(),
            max_attempts: MAX_FETCH_ATTEMPTS,
            max_redirects: MAX_REDIRECTS,
            initial_backoff_ms: STARTING_BACKOFF_DELAY_MS,
            max_backoff_ms: MAX_BACKOFF_DELAY_MS,
        }
    }
}

impl Config {
    /// Default config file location, if the platform has a config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fetchbin").join("config.toml"))
    }

    /// Load the file layer and apply environment overrides.
    ///
    /// `env` looks up environment variables; pass `|key| std::env::var(key).ok()`
    /// outside of tests.
    ///
    /// # Errors
    ///
    /// Fails when an explicitly named file is missing or unreadable, when any
    /// file is not valid TOML, or when an override has an invalid value.
    pub async fn load<F>(explicit: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = explicit.map(Path::to_path_buf).or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_from(&path).await?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path).await?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(env)?;
        Ok(config)
    }

    /// Load a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply `FETCHBIN_*` overrides.
    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(BASE_URL_ENV) {
            self.release_base_url = Some(url);
        }
        if let Some(name) = non_empty(NAME_ENV) {
            self.artifact_name = Some(name);
        }
        if let Some(dir) = non_empty(INSTALL_DIR_ENV) {
            self.install_dir = Some(dir);
        }
        if let Some(dir) = non_empty(LINK_DIR_ENV) {
            self.link_dir = Some(dir);
        }
        if let Some(timeout) = non_empty(TIMEOUT_ENV) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| FetchbinError::ConfigError {
                message: format!("{TIMEOUT_ENV} must be a number of seconds, got '{timeout}'"),
            })?;
        }
        Ok(())
    }

    /// Reject values that would make provisioning impossible.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| FetchbinError::ConfigError {
            message,
        };

        if self.release_base_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            bail!(invalid(format!(
                "no release base URL configured; set release_base_url, {BASE_URL_ENV} or --base-url"
            )));
        }
        if self.artifact_name.as_deref().is_none_or(|name| name.trim().is_empty()) {
            bail!(invalid(format!("no artifact name configured; set artifact_name, {NAME_ENV} or --name")));
        }
        if self.timeout_secs == 0 {
            bail!(invalid("timeout_secs must be greater than zero".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            bail!(invalid("connect_timeout_secs must be greater than zero".to_string()));
        }
        if self.read_timeout_secs == 0 {
            bail!(invalid("read_timeout_secs must be greater than zero".to_string()));
        }
        if self.max_attempts == 0 {
            bail!(invalid("max_attempts must be at least 1".to_string()));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            bail!(invalid("initial_backoff_ms must not exceed max_backoff_ms".to_string()));
        }
        Ok(())
    }

    /// Overall timeout for the network-bound stages.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fetcher options derived from this config.
    #[must_use]
    pub const fn fetch_options(&self, show_progress: bool) -> FetchOptions {
        FetchOptions {
            max_redirects: self.max_redirects,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
            },
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            show_progress,
        }
    }
}

/// Expand `~` and `$VAR` in a configured path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path '{raw}'"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
