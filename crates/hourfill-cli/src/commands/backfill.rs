//! Backfill command implementation

use crate::cli::{BackfillArgs, PathArgs};
use crate::context::RunContext;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use anyhow::Result;
use hourfill_core::processing::ChunkPlanner;
use hourfill_pipeline::BackfillMode;
use hourfill_store::LedgerStore;

use super::{apply_tuning, show_run};

pub async fn execute(args: BackfillArgs, paths: &PathArgs, output: &OutputWriter, dry_run: bool) -> Result<()> {
    let mut overrides = paths.overrides();
    overrides.offset = args.offset;
    apply_tuning(&mut overrides, &args.tuning);

    let ctx = RunContext::load(paths, overrides)?;
    let mode = if args.init {
        BackfillMode::Init {
            overwrite: args.overwrite,
        }
    } else {
        BackfillMode::Append
    };

    if dry_run {
        return plan_backfill(&ctx, &args, mode, output).await;
    }

    let pipeline = ctx.pipeline()?;
    let report = pipeline.backfill(&ctx.catalog, args.start, args.end, mode).await?;
    show_run(output, &report)
}

/// Describe the run from local state only: no credential, no requests
async fn plan_backfill(ctx: &RunContext, args: &BackfillArgs, mode: BackfillMode, output: &OutputWriter) -> Result<()> {
    let settings = ctx.settings()?;
    let unit = ctx.catalog.frequency;
    let chunks = ChunkPlanner::new(settings.offset, unit)?.chunks(args.start, args.end)?;
    let expected = unit.count_between(args.start, args.end);

    let ledger_store = ctx.ledger_store();
    let existing = ledger_store.load().await?;
    let data_path = ctx.config.data_path.value.display().to_string();
    let ledger_path = ledger_store.location();

    let mut actions = Vec::with_capacity(ctx.catalog.series.len() + 2);
    for def in &ctx.catalog.series {
        actions.push(
            PlannedAction::new(
                ActionType::FetchRange,
                format!("Fetch {} ({} {} periods in {} chunks)", def.label(), expected, unit, chunks.len()),
            )
            .with_details(chunks.iter().map(ToString::to_string)),
        );
    }

    match mode {
        BackfillMode::Init { overwrite } => {
            let has_history = existing.as_ref().is_some_and(|l| !l.is_empty());
            if has_history && !overwrite {
                output.warning(format!(
                    "Ledger already exists at {}; this run would stop before fetching. Pass --overwrite to replace it",
                    ledger_path
                ));
            }
            let file_action = if has_history {
                ActionType::OverwriteFile
            } else {
                ActionType::CreateFile
            };
            actions.push(PlannedAction::new(file_action, format!("Write dataset {}", data_path)));
            actions.push(PlannedAction::new(file_action, format!("Write ledger {}", ledger_path)));
        }
        BackfillMode::Append => {
            if existing.is_none() {
                output.warning(format!(
                    "No ledger found at {}; this run would stop. Pass --init to create it",
                    ledger_path
                ));
            }
            let stored = ctx.catalog.series.iter().find_map(|def| {
                let last = existing.as_ref()?.latest_success(&def.facets)?;
                (args.start <= last.end_act).then(|| (def.label(), last.end_act))
            });
            if let Some((label, through)) = stored {
                output.warning(format!(
                    "{} is stored through {}; this run would stop before fetching",
                    label,
                    unit.format(through)
                ));
            }
            actions.push(PlannedAction::new(
                ActionType::AppendFile,
                format!("Append rows of successful series to {}", data_path),
            ));
            actions.push(PlannedAction::new(
                ActionType::AppendFile,
                format!("Append one entry per series to {}", ledger_path),
            ));
        }
    }

    display_planned_actions(output, &actions)
}
