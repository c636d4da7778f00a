//! Serializable and tabular views of command results

use chrono::{DateTime, NaiveDateTime, Utc};
use hourfill_core::config::ConfigSource;
use hourfill_core::models::{LedgerEntry, RunType, TimeUnit};
use hourfill_pipeline::{RefreshWindow, RunReport, SeriesOutcome};
use serde::Serialize;
use tabled::Tabled;

/// One configuration key for `hourfill config`
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigEntry {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl ConfigEntry {
    pub fn new(key: String, value: String, source: ConfigSource) -> Self {
        Self {
            key,
            value,
            source: format!("{:?}", source),
        }
    }
}

/// Per-series line of a run summary
#[derive(Debug, Serialize, Tabled)]
pub struct SeriesRunRow {
    #[tabled(rename = "Series")]
    pub series: String,
    #[tabled(rename = "Run")]
    pub index: u64,
    #[tabled(rename = "Covered")]
    pub covered: String,
    #[tabled(rename = "Obs")]
    pub n_obs: usize,
    #[tabled(rename = "Missing")]
    pub na: usize,
    #[tabled(rename = "Failed chunks")]
    pub failed_chunks: usize,
    #[tabled(rename = "Rows added")]
    pub rows_appended: usize,
    #[tabled(rename = "Success")]
    pub success: bool,
    #[tabled(rename = "Comments")]
    pub comments: String,
}

impl From<&SeriesOutcome> for SeriesRunRow {
    fn from(outcome: &SeriesOutcome) -> Self {
        let entry = &outcome.entry;
        Self {
            series: outcome.label.clone(),
            index: entry.index,
            covered: covered(entry),
            n_obs: entry.n_obs,
            na: entry.na,
            failed_chunks: outcome.failed_chunks(),
            rows_appended: outcome.rows_appended,
            success: entry.success,
            comments: entry.comments.clone(),
        }
    }
}

/// JSON body of a backfill or refresh
#[derive(Debug, Serialize)]
pub struct RunOutput<'a> {
    pub rows_appended: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(flatten)]
    pub report: &'a RunReport,
}

impl<'a> From<&'a RunReport> for RunOutput<'a> {
    fn from(report: &'a RunReport) -> Self {
        Self {
            rows_appended: report.rows_appended(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            report,
        }
    }
}

/// One refresh window for `hourfill plan`
#[derive(Debug, Serialize, Tabled)]
pub struct WindowRow {
    #[tabled(rename = "Series")]
    pub series: String,
    #[tabled(rename = "Last covered")]
    pub last_end: NaiveDateTime,
    #[tabled(rename = "From")]
    pub request_start: NaiveDateTime,
    #[tabled(rename = "To")]
    pub request_end: NaiveDateTime,
    #[tabled(rename = "Pending")]
    pub pending: usize,
}

impl WindowRow {
    pub fn new(window: &RefreshWindow, unit: TimeUnit) -> Self {
        Self {
            series: window.series.to_string(),
            last_end: window.last_end,
            request_start: window.request_start,
            request_end: window.request_end,
            pending: if window.updates_available {
                unit.count_between(window.request_start, window.request_end)
            } else {
                0
            },
        }
    }
}

/// One ledger entry for `hourfill status`
#[derive(Debug, Serialize, Tabled)]
pub struct StatusRow {
    #[tabled(rename = "Series")]
    pub series: String,
    #[tabled(rename = "Run")]
    pub index: u64,
    #[tabled(rename = "Type")]
    pub run_type: RunType,
    #[tabled(rename = "At")]
    pub run_at: DateTime<Utc>,
    #[tabled(rename = "Covered")]
    pub covered: String,
    #[tabled(rename = "Obs")]
    pub n_obs: usize,
    #[tabled(rename = "Missing")]
    pub na: usize,
    #[tabled(rename = "Updated")]
    pub update: bool,
    #[tabled(rename = "Success")]
    pub success: bool,
    #[tabled(rename = "Comments")]
    pub comments: String,
}

impl From<&LedgerEntry> for StatusRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            series: entry.series.to_string(),
            index: entry.index,
            run_type: entry.run_type,
            run_at: entry.run_at,
            covered: covered(entry),
            n_obs: entry.n_obs,
            na: entry.na,
            update: entry.update,
            success: entry.success,
            comments: entry.comments.clone(),
        }
    }
}

/// JSON body of `hourfill probe`
#[derive(Debug, Serialize)]
pub struct ProbeOutput {
    pub api_path: String,
    pub frequency: &'static str,
    pub start_period: NaiveDateTime,
    pub end_period: NaiveDateTime,
}

fn covered(entry: &LedgerEntry) -> String {
    format!("{} .. {}", entry.start_act, entry.end_act)
}
