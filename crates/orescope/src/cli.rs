//! Clap derive structures for the `orescope` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// orescope -- screen mining companies from the command line
#[derive(Debug, Parser)]
#[command(
    name = "orescope",
    version,
    about = "Screen mining companies by status, metrics and price",
    long_about = "Filter, sort and page through the mining company dataset.\n\n\
        Prices are converted to the selected currency and refreshed from the\n\
        secondary price feed when a recent quote is available.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "ORESCOPE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, env = "ORESCOPE_URL", global = true)]
    pub url: Option<String>,

    /// Anonymous API key
    #[arg(long, env = "ORESCOPE_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ORESCOPE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ORESCOPE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TierArg {
    Free,
    Pro,
    Premium,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a filtered screen and print one page of results
    #[command(alias = "s")]
    Screen(ScreenArgs),

    /// Show full details for companies by id
    Show(ShowArgs),

    /// Keep a screen running and print every refreshed snapshot
    Watch(WatchArgs),

    /// Inspect and edit configuration
    Config(ConfigArgs),
}

/// Filter, sort and paging flags shared by `screen` and `watch`.
#[derive(Debug, Clone, Args)]
pub struct ScreenArgs {
    /// Only include companies with this status (repeatable)
    #[arg(long = "status", value_name = "STATUS")]
    pub statuses: Vec<String>,

    /// Lower bound for a metric, as METRIC=VALUE (repeatable)
    #[arg(long = "min", value_name = "METRIC=VALUE")]
    pub min: Vec<String>,

    /// Upper bound for a metric, as METRIC=VALUE (repeatable)
    #[arg(long = "max", value_name = "METRIC=VALUE")]
    pub max: Vec<String>,

    /// Case-insensitive name or ticker search
    #[arg(long)]
    pub search: Option<String>,

    /// Sort key: a metric column or "share_price"
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,

    /// Page to display (clamped to the available pages)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Rows per page (10, 25, 50 or 100)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Display currency, e.g. USD or CAD
    #[arg(long)]
    pub currency: Option<String>,

    /// Subscription tier used to gate metrics
    #[arg(long, default_value = "free")]
    pub tier: TierArg,

    /// Exclude a company from the results by id (repeatable)
    #[arg(long = "exclude", value_name = "ID")]
    pub exclude: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Company ids
    #[arg(required = true)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub screen: ScreenArgs,

    /// Refresh period in seconds (overrides profile)
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration with secrets masked
    Show,

    /// Create or update a profile
    SetProfile {
        /// Profile name
        name: String,

        /// Backend base URL
        #[arg(value_name = "URL")]
        base_url: String,

        /// Environment variable that holds the API key
        #[arg(long)]
        anon_key_env: Option<String>,

        /// Display currency for this profile
        #[arg(long)]
        currency: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },
}
