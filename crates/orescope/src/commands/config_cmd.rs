//! Config subcommand handlers.

use std::fmt::Write as _;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

/// Copy of `cfg` with plaintext keys masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.anon_key.is_some() {
            profile.anon_key = Some(MASK.into());
        }
    }
    cfg
}

/// Format config as TOML-like text, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "currency = \"{}\"", cfg.defaults.currency);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);
    let _ = writeln!(
        out,
        "refresh_interval_secs = {}",
        cfg.defaults.refresh_interval_secs
    );
    let _ = writeln!(out, "max_retries = {}", cfg.defaults.max_retries);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if p.anon_key.is_some() {
            let _ = writeln!(out, "anon_key = \"{MASK}\"");
        }
        if let Some(ref env) = p.anon_key_env {
            let _ = writeln!(out, "anon_key_env = \"{env}\"");
        }
        if let Some(ref currency) = p.currency {
            let _ = writeln!(out, "currency = \"{currency}\"");
        }
        if let Some(page_size) = p.page_size {
            let _ = writeln!(out, "page_size = {page_size}");
        }
        if let Some(secs) = p.refresh_interval_secs {
            let _ = writeln!(out, "refresh_interval_secs = {secs}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(retries) = p.max_retries {
            let _ = writeln!(out, "max_retries = {retries}");
        }
    }

    out
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let rendered = match global.output {
                OutputFormat::Table => format_config_redacted(&cfg),
                format => output::render_single(format, &redacted(&cfg), |_| String::new())?,
            };
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetProfile {
            name,
            base_url,
            anon_key_env,
            currency,
            default,
        } => {
            url::Url::parse(&base_url).map_err(|e| CliError::Validation {
                field: "url".into(),
                reason: format!("{base_url}: {e}"),
            })?;
            if let Some(ref code) = currency {
                code.parse::<orescope_core::Currency>()?;
            }

            let mut cfg = config::load_config()?;
            let profile = cfg.profiles.entry(name.clone()).or_insert_with(Profile::default);
            profile.url = base_url;
            if anon_key_env.is_some() {
                profile.anon_key_env = anon_key_env;
            }
            if currency.is_some() {
                profile.currency = currency;
            }
            if default || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("Saved profile '{name}' to {}", config::config_path().display());
            }
            Ok(())
        }
    }
}
