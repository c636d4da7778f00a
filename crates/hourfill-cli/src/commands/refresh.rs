//! Refresh command implementation

use crate::cli::{PathArgs, RefreshArgs};
use crate::context::RunContext;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use anyhow::Result;
use hourfill_core::HourfillError;
use hourfill_store::LedgerStore;

use super::{apply_tuning, show_run};

pub async fn execute(args: RefreshArgs, paths: &PathArgs, output: &OutputWriter, dry_run: bool) -> Result<()> {
    let mut overrides = paths.overrides();
    apply_tuning(&mut overrides, &args.tuning);
    let ctx = RunContext::load(paths, overrides)?;

    if dry_run {
        return plan_offline(&ctx, output).await;
    }

    let pipeline = ctx.pipeline()?;
    let report = pipeline.refresh(&ctx.catalog).await?;
    show_run(output, &report)
}

/// Start of each series' next window from the ledger alone. The end is
/// only known once the upstream is probed; `hourfill plan` does that.
async fn plan_offline(ctx: &RunContext, output: &OutputWriter) -> Result<()> {
    let ledger_store = ctx.ledger_store();
    let ledger = ledger_store.load().await?.ok_or_else(|| HourfillError::LedgerMissing {
        location: ledger_store.location(),
    })?;
    let unit = ctx.catalog.frequency;

    let mut actions = Vec::with_capacity(ctx.catalog.series.len() + 2);
    for def in &ctx.catalog.series {
        let action = match ledger.latest_success(&def.facets) {
            Some(last) => PlannedAction::new(
                ActionType::FetchRange,
                format!("Fetch {} from {}", def.label(), last.end_act + unit.step(1)),
            )
            .with_detail(format!("Last successful run {} covered up to {}", last.index, last.end_act))
            .with_detail("Ends at the latest period the upstream reports"),
            None => PlannedAction::new(
                ActionType::Skip,
                format!("Skip {}: no successful backfill recorded", def.label()),
            ),
        };
        actions.push(action);
    }

    actions.push(PlannedAction::new(
        ActionType::AppendFile,
        format!("Append new rows to {}", ctx.config.data_path.value.display()),
    ));
    actions.push(PlannedAction::new(
        ActionType::AppendFile,
        format!("Append one entry per series to {}", ledger_store.location()),
    ));

    display_planned_actions(output, &actions)
}
