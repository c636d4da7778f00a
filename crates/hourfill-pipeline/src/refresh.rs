use chrono::NaiveDateTime;
use hourfill_core::models::{Ledger, SeriesId, TimeUnit};
use serde::Serialize;

/// What a refresh should request for one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshWindow {
    pub series: SeriesId,
    /// Covered end of the latest successful run
    pub last_end: NaiveDateTime,
    pub request_start: NaiveDateTime,
    pub request_end: NaiveDateTime,
    /// False when the series is already current
    pub updates_available: bool,
}

/// Refresh windows for every series the ledger tracks, in ledger order
pub fn plan_refresh(ledger: &Ledger, upstream_end: NaiveDateTime, unit: TimeUnit) -> Vec<RefreshWindow> {
    plan_refresh_for(ledger, &ledger.tracked_series(), upstream_end, unit)
}

/// Refresh windows for `series`, in the given order.
///
/// The window starts one unit after the latest successful entry's covered
/// end and stops at `upstream_end`. A series without a successful entry
/// has to be backfilled first and is left out.
pub fn plan_refresh_for(
    ledger: &Ledger,
    series: &[SeriesId],
    upstream_end: NaiveDateTime,
    unit: TimeUnit,
) -> Vec<RefreshWindow> {
    series
        .iter()
        .filter_map(|id| {
            let Some(last) = ledger.latest_success(id) else {
                if ledger.latest(id).is_some() {
                    tracing::warn!(series = %id, "No successful run recorded, backfill before refreshing");
                } else {
                    tracing::warn!(series = %id, "Series not in ledger, backfill before refreshing");
                }
                return None;
            };

            let request_start = last.end_act + unit.step(1);
            let updates_available = request_start <= upstream_end;
            if !updates_available {
                tracing::info!(series = %id, end = %last.end_act, "Series is up to date");
            }

            Some(RefreshWindow {
                series: id.clone(),
                last_end: last.end_act,
                request_start,
                request_end: upstream_end,
                updates_available,
            })
        })
        .collect()
}
