//! Command handlers, one module per subcommand.

pub mod config_cmd;
pub mod screen;
pub mod show;
pub mod watch;

use std::collections::BTreeMap;

use orescope_core::{
    AccessTier, CompanyId, Currency, Metric, MetricRange, ScreenStore, SortDirection, SortState,
    Status,
};

use crate::cli::{ScreenArgs, TierArg};
use crate::error::CliError;

impl From<TierArg> for AccessTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Free => Self::Free,
            TierArg::Pro => Self::Pro,
            TierArg::Premium => Self::Premium,
        }
    }
}

/// Push the filter, sort, paging and exclusion flags into the store.
///
/// The page is not applied here; callers navigate after the first full
/// cycle so the request is clamped against a known total.
pub(crate) fn apply_screen_args(store: &ScreenStore, args: &ScreenArgs) -> Result<(), CliError> {
    if !args.statuses.is_empty() {
        let statuses = args
            .statuses
            .iter()
            .map(|s| {
                s.parse::<Status>().map_err(|_| CliError::Validation {
                    field: "status".into(),
                    reason: format!(
                        "unknown status '{s}' (expected producer, developer, explorer, royalty or other)"
                    ),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        store.set_statuses(statuses);
    }

    for (metric, range) in parse_ranges(&args.min, &args.max)? {
        store.set_metric_range(metric, range);
    }

    if let Some(ref term) = args.search {
        store.set_search_term(term.as_str());
    }

    if args.sort.is_some() || args.asc {
        let key = args
            .sort
            .clone()
            .unwrap_or_else(|| store.state().sort.key);
        let direction = if args.asc {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        store.set_sort(SortState::new(key, direction));
    }

    if let Some(size) = args.page_size {
        store.set_page_size(size)?;
    }

    if let Some(ref code) = args.currency {
        let currency: Currency = code.parse()?;
        store.set_currency(currency);
    }

    for id in &args.exclude {
        store.toggle_exclusion(CompanyId(*id));
    }
    Ok(())
}

/// Merge `--min` and `--max` pairs into one range per metric.
fn parse_ranges(min: &[String], max: &[String]) -> Result<BTreeMap<Metric, MetricRange>, CliError> {
    let mut ranges: BTreeMap<Metric, MetricRange> = BTreeMap::new();
    for raw in min {
        let (metric, value) = parse_bound("min", raw)?;
        ranges.entry(metric).or_default().min = Some(value);
    }
    for raw in max {
        let (metric, value) = parse_bound("max", raw)?;
        ranges.entry(metric).or_default().max = Some(value);
    }
    Ok(ranges)
}

fn parse_bound(field: &str, raw: &str) -> Result<(Metric, f64), CliError> {
    let invalid = |reason: String| CliError::Validation {
        field: field.into(),
        reason,
    };
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| invalid(format!("expected METRIC=VALUE, got '{raw}'")))?;
    let metric: Metric = name
        .trim()
        .parse()
        .map_err(|_| invalid(format!("unknown metric '{}'", name.trim())))?;
    let value: f64 = value
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| invalid(format!("'{}' is not a number", value.trim())))?;
    Ok((metric, value))
}
