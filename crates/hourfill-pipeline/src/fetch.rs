use hourfill_core::error::{HourfillError, Result};
use hourfill_core::models::{Observation, SeriesId, TimeUnit};
use hourfill_core::processing::Chunk;
use hourfill_source::response::normalize;
use hourfill_source::{DataRequest, DataResponse, UpstreamSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff for transient page failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Log-and-skip without retrying
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Rows requested per call
    pub page_size: usize,
    /// Upper bound on calls per chunk
    pub max_pages: usize,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: 5000,
            max_pages: 100,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChunkStatus {
    Fetched { rows: usize, pages: usize },
    /// Upstream answered with no rows; the hours become explicit gaps
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub chunk: Chunk,
    #[serde(flatten)]
    pub status: ChunkStatus,
}

impl ChunkReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ChunkStatus::Failed { .. })
    }
}

/// Everything fetched for one series, plus what happened to each chunk
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Observations of all successful chunks, sorted by period
    pub observations: Vec<Observation>,
    pub chunks: Vec<ChunkReport>,
}

impl FetchOutcome {
    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| c.is_failed())
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Fetches a series chunk by chunk, paging inside each chunk.
///
/// A chunk that fails after its retries is logged and skipped; the run
/// carries on with the next one.
pub struct PagedFetcher<'a, U: ?Sized> {
    source: &'a U,
    settings: FetchSettings,
}

impl<'a, U> PagedFetcher<'a, U>
where
    U: UpstreamSource + ?Sized,
{
    pub fn new(source: &'a U, settings: FetchSettings) -> Self {
        Self { source, settings }
    }

    pub async fn fetch_series(
        &self,
        api_path: &str,
        series: &SeriesId,
        unit: TimeUnit,
        chunks: &[Chunk],
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        for (i, chunk) in chunks.iter().enumerate() {
            tracing::debug!(series = %series, chunk = i + 1, of = chunks.len(), range = %chunk, "Fetching chunk");

            let status = match self.fetch_chunk(api_path, series, unit, chunk).await {
                Ok((observations, _)) if observations.is_empty() => {
                    tracing::info!(series = %series, range = %chunk, "Chunk returned no rows");
                    ChunkStatus::Empty
                }
                Ok((observations, pages)) => {
                    let rows = observations.len();
                    outcome.observations.extend(observations);
                    ChunkStatus::Fetched { rows, pages }
                }
                Err(e) => {
                    tracing::warn!(series = %series, error = %e, "Skipping chunk");
                    ChunkStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            outcome.chunks.push(ChunkReport {
                chunk: *chunk,
                status,
            });
        }

        outcome.observations.sort_by_key(|o| o.period);
        outcome
    }

    /// All pages of one chunk, returned with the number of calls made
    async fn fetch_chunk(
        &self,
        api_path: &str,
        series: &SeriesId,
        unit: TimeUnit,
        chunk: &Chunk,
    ) -> Result<(Vec<Observation>, usize)> {
        let chunk_error = |reason: String| HourfillError::ChunkFetch {
            start: unit.format(chunk.start),
            end: unit.format(chunk.end),
            reason,
        };

        let mut observations = Vec::new();
        let mut received = 0usize;
        let mut pages = 0usize;

        loop {
            let request = DataRequest::new(api_path, series.clone(), unit)
                .with_range(chunk.start, chunk.end)
                .with_page(self.settings.page_size, received);

            let response = self
                .fetch_with_retry(&request)
                .await
                .map_err(|e| chunk_error(e.to_string()))?;
            pages += 1;

            let page_rows = response.records.len();
            observations.extend(normalize(&response.records).map_err(|e| chunk_error(e.to_string()))?);
            received += page_rows;

            let more = response.total.is_some_and(|total| received < total);
            if !more || page_rows == 0 {
                break;
            }
            if pages >= self.settings.max_pages {
                tracing::warn!(
                    series = %series,
                    range = %chunk,
                    pages,
                    received,
                    total = ?response.total,
                    "Page limit reached, keeping the rows received so far"
                );
                break;
            }
        }

        Ok((observations, pages))
    }

    async fn fetch_with_retry(&self, request: &DataRequest) -> Result<DataResponse> {
        let retry = self.settings.retry;
        let mut attempt = 0u32;

        loop {
            match self.source.fetch(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = retry.delay(attempt);
                    tracing::warn!(
                        "Retry {}/{} after {:?} delay: {}",
                        attempt,
                        retry.max_retries,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
