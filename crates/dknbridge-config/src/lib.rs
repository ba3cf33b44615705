//! Shared configuration types, loading, and credential resolution for
//! dknbridge consumers.
//!
//! A config file holds one or more named accounts:
//!
//! ```toml
//! default_account = "home"
//!
//! [accounts.home]
//! email = "home@example.com"
//! ```
//!
//! Passwords resolve in priority order: the `DKNBRIDGE_PASSWORD`
//! environment variable, the OS keyring (service `dknbridge`, user =
//! account email), then a plaintext `password` key in the file
//! (discouraged). Top-level fields can be overridden through
//! `DKNBRIDGE_*` environment variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use dknbridge_core::{BridgeConfig, DEFAULT_BASE_URL};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DKNBRIDGE_";

/// Environment variable consulted first for account passwords.
pub const PASSWORD_ENV_VAR: &str = "DKNBRIDGE_PASSWORD";

const KEYRING_SERVICE: &str = "dknbridge";

// ── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine a configuration directory for this platform")]
    NoConfigDir,

    #[error("Failed to read configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Failed to write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Account not found: {name}")]
    AccountNotFound { name: String },

    #[error(
        "No password available for account '{account}': set {PASSWORD_ENV_VAR}, \
         store one in the OS keyring, or add it to the config file"
    )]
    MissingPassword { account: String },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },
}

// ── Config types ────────────────────────────────────────────────────

/// On-disk configuration: named accounts plus a default selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account: Option<String>,
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
}

/// One cloud account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    /// Plaintext password. Discouraged -- prefer the env var or keyring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Cloud base URL override (test servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Enable the pushed event stream. Default: true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ── Loading and saving ──────────────────────────────────────────────

/// Platform config file location, e.g.
/// `~/.config/dknbridge/config.toml` on Linux.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs =
        directories::ProjectDirs::from("", "", "dknbridge").ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Load configuration from the given file with `DKNBRIDGE_*` env
/// overrides layered on top. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::Load(Box::new(e)))
}

/// Load from an explicit path, or from [`config_path()`] when `None`.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => load_config(p),
        None => load_config(&config_path()?),
    }
}

/// Serialize configuration back to TOML, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

// ── Account selection ───────────────────────────────────────────────

/// Pick the active account: an explicit name, the configured default,
/// or the only account present.
pub fn active_account<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> Result<(&'a str, &'a Account), ConfigError> {
    let name = name
        .or(config.default_account.as_deref())
        .or_else(|| match config.accounts.len() {
            1 => config.accounts.keys().next().map(String::as_str),
            _ => None,
        })
        .ok_or_else(|| ConfigError::AccountNotFound {
            name: "<no account selected>".into(),
        })?;

    config
        .accounts
        .get_key_value(name)
        .map(|(k, v)| (k.as_str(), v))
        .ok_or_else(|| ConfigError::AccountNotFound { name: name.into() })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the password for an account.
///
/// Priority: `DKNBRIDGE_PASSWORD` env var, OS keyring, config file.
/// Keyring failures (no entry, locked, headless platform) fall through
/// to the next source rather than aborting resolution.
pub fn resolve_password(account: &Account, account_name: &str) -> Result<SecretString, ConfigError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR) {
        if !password.is_empty() {
            return Ok(SecretString::from(password));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &account.email) {
        if let Ok(password) = entry.get_password() {
            return Ok(SecretString::from(password));
        }
    }

    if let Some(ref password) = account.password {
        return Ok(SecretString::from(password.clone()));
    }

    Err(ConfigError::MissingPassword {
        account: account_name.to_owned(),
    })
}

/// Store a password in the OS keyring for later resolution.
pub fn store_password(account: &Account, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &account.email)?;
    entry.set_password(password.expose_secret())?;
    Ok(())
}

/// Translate an account into a runtime [`BridgeConfig`].
pub fn resolve_bridge_config(
    account: &Account,
    account_name: &str,
) -> Result<BridgeConfig, ConfigError> {
    let password = resolve_password(account, account_name)?;

    let url_str = account.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let base_url: Url = url_str.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    Ok(BridgeConfig {
        base_url,
        email: account.email.clone(),
        password,
        timeout: Duration::from_secs(account.timeout_secs.unwrap_or(30)),
        events_enabled: account.events.unwrap_or(true),
        poll_interval: Duration::from_secs(account.poll_interval_secs.unwrap_or(30)),
    })
}
