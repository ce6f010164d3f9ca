//! `orescope screen`: one full cycle, then the requested page.

use tracing::debug;

use orescope_core::{Screener, TierSignal};

use crate::cli::{GlobalOpts, ScreenArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ScreenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut screener_config = config::build_screener_config(global)?;
    // One-shot command: nothing should poll in the background.
    screener_config.refresh_interval = std::time::Duration::ZERO;
    let screener = Screener::connect(screener_config)?;

    screener.set_access_tier(TierSignal::Ready(args.tier.into()));
    super::apply_screen_args(screener.store(), &args)?;

    screener.full_cycle().await?;
    if args.page > 1 {
        let published = screener.load_page(args.page).await?;
        debug!(requested = args.page, published, "page navigation");
    }

    let view = screener.view();
    let rendered = output::render_view(global.output, &view)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
