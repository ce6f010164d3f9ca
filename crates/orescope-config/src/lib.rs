//! Configuration for the orescope CLI and other consumers.
//!
//! TOML profiles, credential resolution (env + plaintext), and translation
//! to `orescope_core::ScreenerConfig`. The CLI layers its flag overrides
//! on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orescope_core::{Currency, PageSize, RetryPolicy, ScreenerConfig};

/// Fallback environment variable for the anonymous API key.
pub const ANON_KEY_ENV: &str = "ORESCOPE_ANON_KEY";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the active profile: explicit choice, else the default.
    pub fn profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }
}

/// Values every profile inherits unless it overrides them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Background refresh period in seconds; `0` disables it.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            currency: default_currency(),
            page_size: default_page_size(),
            refresh_interval_secs: default_refresh_interval(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_currency() -> String {
    "USD".into()
}
fn default_page_size() -> u32 {
    25
}
fn default_refresh_interval() -> u64 {
    300
}
fn default_max_retries() -> u32 {
    3
}

/// A named backend profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://project.supabase.co").
    pub url: String,

    /// Anonymous API key (plaintext; prefer an env var).
    pub anon_key: Option<String>,

    /// Environment variable holding the API key.
    pub anon_key_env: Option<String>,

    pub currency: Option<String>,
    pub page_size: Option<u32>,
    pub refresh_interval_secs: Option<u64>,
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "orescope", "orescope").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("orescope");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, layered as defaults → file → `ORESCOPE_` env.
///
/// Nested keys use a double underscore: `ORESCOPE_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ORESCOPE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the API key: profile env var → `ORESCOPE_ANON_KEY` → plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.anon_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(val) = std::env::var(ANON_KEY_ENV) {
        return Ok(SecretString::from(val));
    }

    if let Some(ref key) = profile.anon_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to the core config ──────────────────────────────────

/// Build a `ScreenerConfig` from a profile and the global defaults.
pub fn profile_to_screener_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ScreenerConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let api_key = resolve_api_key(profile, profile_name)?;

    let currency_raw = profile.currency.as_deref().unwrap_or(&defaults.currency);
    let currency: Currency = currency_raw.parse().map_err(|_| ConfigError::Validation {
        field: "currency".into(),
        reason: format!("expected a three-letter code, got '{currency_raw}'"),
    })?;

    let page_size_raw = profile.page_size.unwrap_or(defaults.page_size);
    let page_size = PageSize::try_from(page_size_raw).map_err(|_| ConfigError::Validation {
        field: "page_size".into(),
        reason: format!("expected one of {:?}, got {page_size_raw}", PageSize::ALLOWED),
    })?;

    let mut config = ScreenerConfig::new(url, api_key);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.retry = RetryPolicy::new(profile.max_retries.unwrap_or(defaults.max_retries));
    config.refresh_interval = Duration::from_secs(
        profile
            .refresh_interval_secs
            .unwrap_or(defaults.refresh_interval_secs),
    );
    config.default_currency = currency;
    config.default_page_size = page_size;
    Ok(config)
}
