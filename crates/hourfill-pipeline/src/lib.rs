//! Hourfill Pipeline - Backfill and refresh drivers
//!
//! This crate wires the upstream source and the stores together: the paged
//! fetcher, the refresh planner, and the pipeline that turns a series
//! catalog into dataset rows and ledger entries.

pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod refresh;

pub use fetch::{ChunkReport, ChunkStatus, FetchOutcome, FetchSettings, PagedFetcher, RetryPolicy};
pub use models::{RunReport, SeriesOutcome};
pub use pipeline::{BackfillMode, Pipeline, PipelineSettings};
pub use refresh::{plan_refresh, plan_refresh_for, RefreshWindow};
