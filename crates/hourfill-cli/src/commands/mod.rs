//! Command implementations

mod backfill;
mod config;
mod plan;
mod probe;
mod refresh;
mod status;

use crate::cli::{Cli, Commands, TuningArgs};
use crate::output::OutputWriter;
use crate::output_types::{RunOutput, SeriesRunRow};
use anyhow::Result;
use hourfill_core::config::CliConfigOverrides;
use hourfill_pipeline::RunReport;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match cli.command {
        Commands::Backfill(args) => backfill::execute(args, &cli.paths, &output, cli.dry_run).await,
        Commands::Refresh(args) => refresh::execute(args, &cli.paths, &output, cli.dry_run).await,
        Commands::Plan => plan::execute(&cli.paths, &output).await,
        Commands::Status(args) => status::execute(args, &cli.paths, &output).await,
        Commands::Probe => probe::execute(&cli.paths, &output).await,
        Commands::Config => config::execute(&cli.paths, &output),
    }
}

fn apply_tuning(overrides: &mut CliConfigOverrides, tuning: &TuningArgs) {
    overrides.missing_tolerance = tuning.missing_tolerance;
    overrides.max_retries = tuning.max_retries;
}

/// Summary shared by backfill and refresh
fn show_run(output: &OutputWriter, report: &RunReport) -> Result<()> {
    if output.is_json() {
        return output.result(RunOutput::from(report));
    }

    output.section(format!("{} run at {}", report.run_type, report.run_at));
    output.table(report.outcomes.iter().map(SeriesRunRow::from).collect::<Vec<_>>())?;

    if report.failed() > 0 {
        output.warning(format!(
            "{} of {} series did not complete; see the comments above",
            report.failed(),
            report.outcomes.len()
        ));
    }
    if report.all_current() {
        output.info("Every series is already up to date");
    } else {
        output.success(format!(
            "Appended {} rows for {} series",
            report.rows_appended(),
            report.outcomes.iter().filter(|o| o.rows_appended > 0).count()
        ));
    }
    Ok(())
}
