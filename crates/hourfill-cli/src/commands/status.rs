//! Status command implementation

use crate::cli::{PathArgs, StatusArgs};
use crate::config_loader::load_config_with_overrides;
use crate::output::OutputWriter;
use crate::output_types::StatusRow;
use anyhow::Result;
use hourfill_core::HourfillError;
use hourfill_store::{CsvLedgerStore, LedgerStore};

/// Reads the ledger file only, so it works without a credential or catalog
pub async fn execute(args: StatusArgs, paths: &PathArgs, output: &OutputWriter) -> Result<()> {
    let config = load_config_with_overrides(paths.config.as_deref(), paths.overrides())?;
    let store = CsvLedgerStore::new(&config.ledger_path.value);

    let ledger = store.load().await?.ok_or_else(|| HourfillError::LedgerMissing {
        location: store.location(),
    })?;

    let rows: Vec<StatusRow> = if args.history {
        ledger.entries.iter().map(StatusRow::from).collect()
    } else {
        ledger
            .tracked_series()
            .iter()
            .filter_map(|series| ledger.latest(series))
            .map(StatusRow::from)
            .collect()
    };
    let failing = rows.iter().filter(|r| !r.success).count();

    output.section(format!("Ledger {}", store.location()));
    output.table(rows)?;
    if !args.history && failing > 0 {
        output.warning(format!(
            "{} series failed their latest run; the next refresh starts after their last success",
            failing
        ));
    }
    Ok(())
}
