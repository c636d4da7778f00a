//! Probe command implementation

use crate::cli::PathArgs;
use crate::context::RunContext;
use crate::output::OutputWriter;
use crate::output_types::ProbeOutput;
use anyhow::Result;
use hourfill_source::UpstreamSource;

pub async fn execute(paths: &PathArgs, output: &OutputWriter) -> Result<()> {
    let ctx = RunContext::load(paths, paths.overrides())?;
    let client = ctx.client()?;

    let coverage = client.coverage(&ctx.catalog.api_path).await?;
    let probe = ProbeOutput {
        api_path: ctx.catalog.api_path.clone(),
        frequency: ctx.catalog.frequency.frequency(),
        start_period: coverage.start_period,
        end_period: coverage.end_period,
    };

    if output.is_json() {
        return output.result(probe);
    }

    output.section("Upstream Coverage");
    output.kv("Route", &probe.api_path);
    output.kv("Frequency", probe.frequency);
    output.kv("First period", probe.start_period);
    output.kv("Latest period", probe.end_period);
    Ok(())
}
