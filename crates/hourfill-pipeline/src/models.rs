use chrono::{DateTime, Utc};
use hourfill_core::models::{LedgerEntry, RunType};
use serde::Serialize;

use crate::fetch::ChunkReport;

/// What one run did to one series
#[derive(Debug, Clone, Serialize)]
pub struct SeriesOutcome {
    /// Catalog name, or the facet string when unnamed
    pub label: String,

    /// The entry written to the ledger
    pub entry: LedgerEntry,

    /// Per-chunk fetch results, empty when nothing was fetched
    pub chunks: Vec<ChunkReport>,

    /// Rows appended to the dataset for this series
    pub rows_appended: usize,

    pub updates_available: bool,
}

impl SeriesOutcome {
    pub fn failed_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_failed()).count()
    }
}

/// Result of a backfill or refresh run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_type: RunType,
    pub run_at: DateTime<Utc>,
    pub outcomes: Vec<SeriesOutcome>,
}

impl RunReport {
    pub fn rows_appended(&self) -> usize {
        self.outcomes.iter().map(|o| o.rows_appended).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.entry.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when no series had anything new to fetch
    pub fn all_current(&self) -> bool {
        self.outcomes.iter().all(|o| !o.updates_available)
    }
}
