//! Output formatting: table, JSON, compact JSON.
//!
//! Table uses `tabled`; structured formats serialize the original data via
//! serde.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use orescope_core::{Company, ScreenView};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
    }
}

/// Render a single item; table output uses `detail_fn`.
pub fn render_single<T: Serialize>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Company rows ─────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct CompanyRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Market Cap")]
    market_cap: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// Table row for one company.
pub fn company_row(c: &Company) -> CompanyRow {
    CompanyRow {
        id: c.id.get(),
        name: c.name.clone(),
        ticker: c.ticker.clone().unwrap_or_else(|| "-".into()),
        status: c.status.to_string(),
        market_cap: compact_number(c.financials.market_cap),
        price: c
            .price
            .value
            .map_or_else(|| "-".into(), |v| format!("{v:.2} {}", c.price.currency)),
        source: c.price.source.as_str().into(),
    }
}

/// Format large values with a magnitude suffix (`1.25B`, `430.0M`).
pub fn compact_number(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "-".into();
    };
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        format!("{v:.2}")
    }
}

/// Render a computed view: rows followed by a counts footer in table mode.
pub fn render_view(format: OutputFormat, view: &ScreenView) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<CompanyRow> = view.items.iter().map(company_row).collect();
            Ok(format!("{}\n{}", render_table(&rows), view_summary(view)))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(view)?),
    }
}

/// One-line page and count summary.
pub fn view_summary(view: &ScreenView) -> String {
    let mut line = format!(
        "Page {}/{} · {} companies",
        view.page, view.page_count, view.effective_total
    );
    if view.excluded > 0 {
        line.push_str(&format!(
            " ({} matching, {} excluded)",
            view.total_count, view.excluded
        ));
    }
    line
}

/// Key/value detail block for `show`.
pub fn company_detail(c: &Company) -> String {
    let mut lines = vec![
        format!("ID:            {}", c.id),
        format!("Name:          {}", c.name),
        format!("Ticker:        {}", c.ticker.as_deref().unwrap_or("-")),
        format!("Status:        {}", c.status),
    ];
    if let Some(ref hq) = c.headquarters {
        lines.push(format!("Headquarters:  {hq}"));
    }
    lines.push(format!(
        "Market Cap:    {}",
        compact_number(c.financials.market_cap)
    ));
    lines.push(format!(
        "Enterprise:    {}",
        compact_number(c.financials.enterprise_value)
    ));
    lines.push(format!(
        "Price:         {} {} ({})",
        c.price
            .value
            .map_or_else(|| "-".into(), |v| format!("{v:.2}")),
        c.price.currency,
        c.price.source.as_str()
    ));
    if let Some(as_of) = c.price.as_of {
        lines.push(format!("Price as of:   {}", as_of.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(ref description) = c.description {
        lines.push(String::new());
        lines.push(description.clone());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_number_picks_magnitude() {
        assert_eq!(compact_number(None), "-");
        assert_eq!(compact_number(Some(1_250_000_000.0)), "1.25B");
        assert_eq!(compact_number(Some(430_000_000.0)), "430.0M");
        assert_eq!(compact_number(Some(12_500.0)), "12.5K");
        assert_eq!(compact_number(Some(-2_000_000.0)), "-2.0M");
        assert_eq!(compact_number(Some(7.5)), "7.50");
    }
}
