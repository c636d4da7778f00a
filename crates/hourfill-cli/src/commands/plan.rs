//! Plan command implementation

use crate::cli::PathArgs;
use crate::context::RunContext;
use crate::output::OutputWriter;
use crate::output_types::WindowRow;
use anyhow::Result;

pub async fn execute(paths: &PathArgs, output: &OutputWriter) -> Result<()> {
    let ctx = RunContext::load(paths, paths.overrides())?;
    let unit = ctx.catalog.frequency;

    let windows = ctx.pipeline()?.plan_refresh(&ctx.catalog).await?;
    let rows: Vec<WindowRow> = windows.iter().map(|w| WindowRow::new(w, unit)).collect();
    let pending = rows.iter().filter(|r| r.pending > 0).count();

    output.section("Refresh Windows");
    output.table(rows)?;
    if pending == 0 {
        output.info("Every series is up to date");
    } else {
        output.info(format!("{} series have new data. Run: hourfill refresh", pending));
    }
    Ok(())
}
