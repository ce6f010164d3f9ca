//! CLI configuration: thin wrapper around `orescope_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (`--url`, `--api-key`, `--timeout`).

use std::time::Duration;

use secrecy::SecretString;

use orescope_core::ScreenerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use orescope_config::{Config, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_string()
}

/// Build a `ScreenerConfig` from the config file, profile and CLI overrides.
///
/// A named profile that does not exist is an error; the implicit default
/// profile may be absent when `--url` is given.
pub fn build_screener_config(global: &GlobalOpts) -> Result<ScreenerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    // URL (flag > env > profile)
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if profile.url.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }

    // The key flag wins over every profile source.
    if let Some(ref key) = global.api_key {
        profile.anon_key = Some(key.clone());
        profile.anon_key_env = None;
    }
    let mut screener =
        orescope_config::profile_to_screener_config(&profile, &profile_name, &cfg.defaults)?;
    if let Some(ref key) = global.api_key {
        screener.api_key = SecretString::from(key.clone());
    }

    if let Some(timeout) = global.timeout {
        screener.timeout = Duration::from_secs(timeout);
    }
    Ok(screener)
}
