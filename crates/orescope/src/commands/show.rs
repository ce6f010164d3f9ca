//! `orescope show`: detail lookup by company id.

use orescope_core::{CompanyId, Screener};

use crate::cli::{GlobalOpts, ShowArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ShowArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let screener = Screener::connect(config::build_screener_config(global)?)?;
    let ids: Vec<CompanyId> = args.ids.iter().copied().map(CompanyId).collect();
    let companies = screener.fetch_by_ids(&ids).await?;

    if let [id] = args.ids.as_slice() {
        let company = companies
            .first()
            .ok_or(CliError::CompanyNotFound { id: *id })?;
        let rendered = output::render_single(global.output, company, output::company_detail)?;
        output::print_output(&rendered, global.quiet);
        return Ok(());
    }

    for id in &ids {
        if !companies.iter().any(|c| c.id == *id) {
            tracing::warn!(%id, "no company found");
        }
    }
    let rendered = output::render_list(global.output, &companies, output::company_row)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
