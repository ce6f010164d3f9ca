//! `orescope watch`: keep the screener running and print each snapshot.

use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use orescope_core::{Screener, TierSignal};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut screener_config = config::build_screener_config(global)?;
    if let Some(secs) = args.interval {
        screener_config.refresh_interval = Duration::from_secs(secs);
    }
    let screener = Screener::connect(screener_config)?;

    super::apply_screen_args(screener.store(), &args.screen)?;
    let mut snapshots = screener.subscribe_snapshot();
    let mut errors = screener.subscribe_error();
    screener.start().await;
    screener.set_access_tier(TierSignal::Ready(args.screen.tier.into()));
    info!(
        interval_secs = screener.config().refresh_interval.as_secs(),
        "watching, press Ctrl-C to stop"
    );

    // Navigate once the first full cycle has a total to clamp against.
    let mut pending_page = (args.screen.page > 1).then_some(args.screen.page);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = errors.changed() => {
                if changed.is_err() {
                    break;
                }
                let message = errors.borrow_and_update().clone();
                if let Some(message) = message {
                    warn!(error = %message, "cycle failed");
                }
            }
            snapshot = snapshots.changed() => {
                let Some(snapshot) = snapshot else { break };
                if snapshot.fetched_at.is_none() {
                    continue;
                }
                if let Some(page) = pending_page.take() {
                    if screener.store().set_page(page) != snapshot.page {
                        continue;
                    }
                }
                print_view(&screener, global)?;
            }
        }
    }

    screener.shutdown().await;
    Ok(())
}

fn print_view<R: orescope_core::RemoteSource>(
    screener: &Screener<R>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let view = screener.view();
    let rendered = match global.output {
        OutputFormat::Table => format!(
            "── {} ──\n{}",
            Local::now().format("%H:%M:%S"),
            output::render_view(global.output, &view)?
        ),
        // One document per line so the stream can be piped.
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_view(OutputFormat::JsonCompact, &view)?
        }
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
