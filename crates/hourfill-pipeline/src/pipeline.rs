use chrono::{DateTime, NaiveDateTime, Utc};
use hourfill_core::config::LayeredConfig;
use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{DatasetRow, Ledger, LedgerEntry, RunType, SeriesCatalog, SeriesDef};
use hourfill_core::processing::{assemble, summarize, ChunkPlanner, CompletenessPolicy};
use hourfill_source::UpstreamSource;
use hourfill_store::ports::{DatasetStore, LedgerStore};

use crate::fetch::{ChunkReport, FetchSettings, PagedFetcher, RetryPolicy};
use crate::models::{RunReport, SeriesOutcome};
use crate::refresh::{plan_refresh_for, RefreshWindow};

pub const REFRESH_FAILED: &str = "The data refresh failed, please check the log";
pub const NO_NEW_DATA: &str = "No new data is available";
pub const DATASET_WRITE_FAILED: &str = "Dataset write failed, rows were not stored";

/// Tunables shared by backfill and refresh runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Chunk step in catalog units
    pub offset: i64,
    pub fetch: FetchSettings,
    pub policy: CompletenessPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            offset: 2250,
            fetch: FetchSettings::default(),
            policy: CompletenessPolicy::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            offset: config.offset.value,
            fetch: FetchSettings {
                page_size: config.page_size.value,
                retry: RetryPolicy {
                    max_retries: config.max_retries.value,
                    backoff_ms: config.retry_backoff_ms.value,
                },
                ..FetchSettings::default()
            },
            policy: CompletenessPolicy::new(config.missing_tolerance.value)?,
        })
    }
}

/// How a backfill treats existing stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillMode {
    /// Create the dataset and ledger; replace a non-empty ledger only with `overwrite`
    Init { overwrite: bool },
    /// Add to an existing dataset and ledger
    Append,
}

/// One series processed but not yet persisted
struct PendingSeries {
    label: String,
    entry: LedgerEntry,
    rows: Vec<DatasetRow>,
    chunks: Vec<ChunkReport>,
    updates_available: bool,
}

/// Backfill and refresh driver over an upstream source and two stores
pub struct Pipeline<U, D, L>
where
    U: UpstreamSource,
    D: DatasetStore,
    L: LedgerStore,
{
    source: U,
    dataset: D,
    ledger: L,
    settings: PipelineSettings,
}

impl<U, D, L> Pipeline<U, D, L>
where
    U: UpstreamSource,
    D: DatasetStore,
    L: LedgerStore,
{
    pub fn new(source: U, dataset: D, ledger: L, settings: PipelineSettings) -> Self {
        Self {
            source,
            dataset,
            ledger,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn dataset_store(&self) -> &D {
        &self.dataset
    }

    pub fn ledger_store(&self) -> &L {
        &self.ledger
    }

    /// Pull `[start, end]` for every catalog series.
    ///
    /// Argument errors and ledger conflicts abort before any request is
    /// sent. Chunk failures only show up in the ledger entries. An append
    /// must start after every series' last stored period.
    pub async fn backfill(
        &self,
        catalog: &SeriesCatalog,
        start: NaiveDateTime,
        end: NaiveDateTime,
        mode: BackfillMode,
    ) -> Result<RunReport> {
        let unit = catalog.frequency;
        let chunks = ChunkPlanner::new(self.settings.offset, unit)?.chunks(start, end)?;

        let existing = self.ledger.load().await?;
        let base = match mode {
            BackfillMode::Init { overwrite } => {
                if !overwrite && existing.as_ref().is_some_and(|l| !l.is_empty()) {
                    return Err(HourfillError::LedgerWriteConflict {
                        location: self.ledger.location(),
                    });
                }
                Ledger::default()
            }
            BackfillMode::Append => existing.ok_or_else(|| HourfillError::LedgerMissing {
                location: self.ledger.location(),
            })?,
        };
        if mode == BackfillMode::Append {
            reject_overlap(&base, catalog, start)?;
        }

        tracing::info!(
            series = catalog.series.len(),
            chunks = chunks.len(),
            start = %unit.format(start),
            end = %unit.format(end),
            "Starting backfill"
        );

        let run_at = Utc::now();
        let fetcher = PagedFetcher::new(&self.source, self.settings.fetch);
        let data_path = catalog.data_path();
        let mut pending = Vec::with_capacity(catalog.series.len());

        for def in &catalog.series {
            let outcome = fetcher.fetch_series(&data_path, &def.facets, unit, &chunks).await;
            let failures = failure_notes(&outcome.chunks);
            let assembled = assemble(&def.facets, outcome.observations, start, end, unit);

            let mut entry = summarize(&assembled, RunType::Backfill, &self.settings.policy, run_at);
            entry.index = base.next_run_index(&def.facets);
            for note in &failures {
                entry.add_comment(note);
            }

            log_summary(def, &entry);
            pending.push(PendingSeries {
                label: def.label(),
                entry,
                rows: assembled.rows,
                chunks: outcome.chunks,
                updates_available: true,
            });
        }

        let (init, overwrite) = match mode {
            BackfillMode::Init { overwrite } => (true, overwrite),
            BackfillMode::Append => (false, false),
        };
        self.persist(RunType::Backfill, run_at, pending, init, overwrite).await
    }

    /// Refresh windows for the catalog series, from the ledger and the
    /// upstream's current coverage. Nothing is fetched or written.
    pub async fn plan_refresh(&self, catalog: &SeriesCatalog) -> Result<Vec<RefreshWindow>> {
        let ledger = self.require_ledger().await?;
        self.windows(&ledger, catalog).await
    }

    /// Fetch what became available since each series' last successful run
    pub async fn refresh(&self, catalog: &SeriesCatalog) -> Result<RunReport> {
        let unit = catalog.frequency;
        let planner = ChunkPlanner::new(self.settings.offset, unit)?;
        let ledger = self.require_ledger().await?;
        let windows = self.windows(&ledger, catalog).await?;

        let run_at = Utc::now();
        let fetcher = PagedFetcher::new(&self.source, self.settings.fetch);
        let data_path = catalog.data_path();
        let mut pending = Vec::with_capacity(windows.len());

        for window in windows {
            let label = catalog
                .series
                .iter()
                .find(|d| d.facets == window.series)
                .map(SeriesDef::label)
                .unwrap_or_else(|| window.series.to_string());
            let index = ledger.next_run_index(&window.series);

            if !window.updates_available {
                pending.push(PendingSeries {
                    label,
                    entry: current_entry(&window, index, run_at),
                    rows: Vec::new(),
                    chunks: Vec::new(),
                    updates_available: false,
                });
                continue;
            }

            let chunks = planner.chunks(window.request_start, window.request_end)?;
            let outcome = fetcher.fetch_series(&data_path, &window.series, unit, &chunks).await;
            let failures = failure_notes(&outcome.chunks);
            let assembled = assemble(
                &window.series,
                outcome.observations,
                window.request_start,
                window.request_end,
                unit,
            );

            let mut entry = summarize(&assembled, RunType::Refresh, &self.settings.policy, run_at);
            entry.index = index;
            for note in &failures {
                entry.add_comment(note);
            }
            if !entry.success {
                entry.add_comment(REFRESH_FAILED);
            }

            tracing::info!(
                series = %label,
                n_obs = entry.n_obs,
                na = entry.na,
                success = entry.success,
                "Refreshed series"
            );
            pending.push(PendingSeries {
                label,
                entry,
                rows: assembled.rows,
                chunks: outcome.chunks,
                updates_available: true,
            });
        }

        if pending.iter().all(|p| !p.updates_available) {
            tracing::info!("All series are up to date");
        }

        self.persist(RunType::Refresh, run_at, pending, false, false).await
    }

    async fn require_ledger(&self) -> Result<Ledger> {
        self.ledger.load().await?.ok_or_else(|| HourfillError::LedgerMissing {
            location: self.ledger.location(),
        })
    }

    async fn windows(&self, ledger: &Ledger, catalog: &SeriesCatalog) -> Result<Vec<RefreshWindow>> {
        let coverage = self.source.coverage(&catalog.api_path).await?;
        tracing::info!(end = %catalog.frequency.format(coverage.end_period), "Upstream coverage");
        Ok(plan_refresh_for(ledger, &catalog.ids(), coverage.end_period, catalog.frequency))
    }

    /// Write dataset rows of successful series, then the ledger.
    ///
    /// When the dataset write fails the affected entries are downgraded and
    /// the ledger is still written before the error is returned.
    async fn persist(
        &self,
        run_type: RunType,
        run_at: DateTime<Utc>,
        mut pending: Vec<PendingSeries>,
        init: bool,
        overwrite: bool,
    ) -> Result<RunReport> {
        let mut rows = Vec::new();
        for series in pending.iter_mut() {
            if series.entry.success && !series.rows.is_empty() {
                series.entry.update = true;
                rows.extend(series.rows.iter().cloned());
            } else {
                series.entry.update = false;
                series.rows.clear();
            }
        }

        let dataset_result = if init || !rows.is_empty() {
            self.dataset.append(&rows, init).await
        } else {
            Ok(0)
        };

        if let Err(e) = &dataset_result {
            tracing::error!(location = %self.dataset.location(), error = %e, "Dataset write failed");
            for series in pending.iter_mut().filter(|s| s.entry.update) {
                series.entry.update = false;
                series.entry.success = false;
                series.entry.add_comment(DATASET_WRITE_FAILED);
                series.rows.clear();
            }
        } else if !rows.is_empty() {
            tracing::info!(rows = rows.len(), location = %self.dataset.location(), "Appended dataset rows");
        }

        let entries = pending.iter().map(|p| p.entry.clone()).collect();
        self.ledger.append(entries, init, overwrite).await?;
        tracing::info!(entries = pending.len(), location = %self.ledger.location(), "Wrote ledger");

        dataset_result?;

        Ok(RunReport {
            run_type,
            run_at,
            outcomes: pending
                .into_iter()
                .map(|p| SeriesOutcome {
                    label: p.label,
                    rows_appended: p.rows.len(),
                    entry: p.entry,
                    chunks: p.chunks,
                    updates_available: p.updates_available,
                })
                .collect(),
        })
    }
}

/// Entry recorded for a series that had nothing new to fetch
fn current_entry(window: &RefreshWindow, index: u64, run_at: DateTime<Utc>) -> LedgerEntry {
    let mut entry = LedgerEntry {
        index,
        series: window.series.clone(),
        run_at,
        start: window.request_start,
        end: window.request_end,
        start_act: window.last_end,
        end_act: window.last_end,
        start_match: true,
        end_match: true,
        n_obs: 0,
        na: 0,
        run_type: RunType::Refresh,
        update: false,
        success: true,
        comments: String::new(),
    };
    entry.add_comment(NO_NEW_DATA);
    entry
}

/// Fail when an appended range would repeat periods already in the dataset
fn reject_overlap(ledger: &Ledger, catalog: &SeriesCatalog, start: NaiveDateTime) -> Result<()> {
    let unit = catalog.frequency;
    for def in &catalog.series {
        if let Some(last) = ledger.latest_success(&def.facets) {
            if start <= last.end_act {
                return Err(HourfillError::invalid_argument(format!(
                    "Backfill start {} overlaps stored data for {} (through {}); start after it or use refresh",
                    unit.format(start),
                    def.label(),
                    unit.format(last.end_act)
                )));
            }
        }
    }
    Ok(())
}

fn failure_notes(chunks: &[ChunkReport]) -> Vec<String> {
    chunks
        .iter()
        .filter(|c| c.is_failed())
        .map(|c| format!("Chunk fetch failed for {}", c.chunk))
        .collect()
}

fn log_summary(def: &SeriesDef, entry: &LedgerEntry) {
    if entry.success {
        tracing::info!(series = %def.label(), n_obs = entry.n_obs, na = entry.na, "Backfilled series");
    } else {
        tracing::warn!(
            series = %def.label(),
            n_obs = entry.n_obs,
            na = entry.na,
            comments = %entry.comments,
            "Backfill incomplete"
        );
    }
}
