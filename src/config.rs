//! Configuration for connecting to the remote task table.
//!
//! Settings come from an optional `mytodo.yaml` file, then from the
//! environment (`SUPABASE_URL`, `SUPABASE_ANON_KEY`, `MYTODO_TABLE`), with a
//! `.env` file in the working directory feeding the environment for
//! variables that are not already set.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file path relative to the working directory.
pub const CONFIG_FILE_PATH: &str = "mytodo.yaml";

/// Environment variable holding the project URL.
pub const URL_VAR: &str = "SUPABASE_URL";

/// Environment variable holding the public (anon) access key.
pub const KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Environment variable overriding the table name.
pub const TABLE_VAR: &str = "MYTODO_TABLE";

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "tasks";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Connection settings for the remote task store.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public access key sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,

    /// Name of the task table.
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: default_table(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StoreConfig {
    /// Load config from a specific base directory, returning None if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(base_dir: &Path) -> Result<Option<Self>> {
        let config_path = Self::config_path(base_dir);
        if !config_path.exists() {
            return Ok(None);
        }
        Self::load_file(&config_path).map(Some)
    }

    /// Load config from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        if config.table.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("{}: table must not be empty", path.display())));
        }
        Ok(config)
    }

    /// Resolve the full configuration: `.env`, config file, then environment.
    ///
    /// An explicit `config_file` must exist; otherwise `mytodo.yaml` in
    /// `base_dir` is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or parsed.
    pub fn resolve(config_file: Option<&Path>, base_dir: &Path) -> Result<Self> {
        load_dotenv(base_dir);

        let config = match config_file {
            Some(path) => Self::load_file(path)?,
            None => Self::load_from(base_dir)?.unwrap_or_default(),
        };

        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    ///
    /// Empty values count as unset.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(URL_VAR) {
            self.url = Some(url);
        }
        if let Some(key) = lookup(KEY_VAR) {
            self.anon_key = Some(key);
        }
        if let Some(table) = lookup(TABLE_VAR) {
            self.table = table;
        }
        self
    }

    /// Names of the settings that still need a value before the store can work.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.url) {
            missing.push(URL_VAR);
        }
        if blank(&self.anon_key) {
            missing.push(KEY_VAR);
        }
        missing
    }

    /// Whether both the URL and the access key are set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Log a warning if the store cannot work with this configuration.
    ///
    /// Returns `true` if the configuration is complete.
    pub fn warn_if_incomplete(&self) -> bool {
        let missing = self.missing();
        if missing.is_empty() {
            return true;
        }
        tracing::warn!(
            missing = %missing.join(", "),
            "{} is not set; the task store will not work until it is configured",
            missing.join(" or ")
        );
        false
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the config file path for a base directory.
    #[must_use]
    pub fn config_path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE_PATH)
    }
}

/// Load `.env` from `base_dir` into the process environment, keeping existing values.
fn load_dotenv(base_dir: &Path) {
    let path = base_dir.join(".env");
    if !path.exists() {
        return;
    }
    if let Err(e) = dotenvy::from_path(&path) {
        tracing::warn!(path = %path.display(), "could not read .env file: {e}");
    }
}
