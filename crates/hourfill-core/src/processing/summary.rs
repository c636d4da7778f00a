use crate::error::{HourfillError, Result};
use crate::models::{LedgerEntry, RunType};
use crate::processing::AssembledSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MISSING_VALUES: &str = "Missing values were found";
pub const START_MISMATCH: &str = "Start period mismatch";
pub const END_MISMATCH: &str = "End period mismatch";
pub const NO_OBSERVATIONS: &str = "No observations were returned";

/// Completeness threshold deciding a ledger entry's success flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletenessPolicy {
    /// Largest accepted fraction of missing rows, in `[0, 1]`
    pub missing_tolerance: f64,
}

impl Default for CompletenessPolicy {
    fn default() -> Self {
        Self {
            missing_tolerance: 0.05,
        }
    }
}

impl CompletenessPolicy {
    pub fn new(missing_tolerance: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&missing_tolerance) {
            return Err(HourfillError::ConfigInvalid {
                key: "missing_tolerance".to_string(),
                reason: format!("must be between 0 and 1, got {}", missing_tolerance),
            });
        }
        Ok(Self { missing_tolerance })
    }

    /// Only a series with no missing rows at all is complete
    pub fn strict() -> Self {
        Self {
            missing_tolerance: 0.0,
        }
    }

    pub fn accepts(&self, missing: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        (missing as f64 / total as f64) <= self.missing_tolerance
    }
}

/// Build the ledger entry describing one assembled series.
///
/// The entry's `index` is left at 0 and `update` at false; the driver sets
/// both once it knows the series' next run index and whether rows were
/// appended.
pub fn summarize(
    assembled: &AssembledSeries,
    run_type: RunType,
    policy: &CompletenessPolicy,
    run_at: DateTime<Utc>,
) -> LedgerEntry {
    let n_obs = assembled.rows.len();
    let na = assembled.missing();

    let start_act = assembled.first_observed().unwrap_or(assembled.start);
    let end_act = assembled.last_observed().unwrap_or(assembled.end);
    let start_match = start_act == assembled.start;
    let end_match = end_act == assembled.end;
    let any_observed = na < n_obs;

    let success = any_observed && start_match && end_match && policy.accepts(na, n_obs);

    let mut entry = LedgerEntry {
        index: 0,
        series: assembled.series.clone(),
        run_at,
        start: assembled.start,
        end: assembled.end,
        start_act,
        end_act,
        start_match,
        end_match,
        n_obs,
        na,
        run_type,
        update: false,
        success,
        comments: String::new(),
    };

    if !any_observed {
        entry.add_comment(NO_OBSERVATIONS);
    } else if na > 0 {
        entry.add_comment(MISSING_VALUES);
    }
    if any_observed && !start_match {
        entry.add_comment(START_MISMATCH);
    }
    if any_observed && !end_match {
        entry.add_comment(END_MISMATCH);
    }

    entry
}
