use async_trait::async_trait;
use hourfill_core::error::Result;
use hourfill_core::models::{Dataset, DatasetRow, Ledger, LedgerEntry};

/// Port for the persisted observation table
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Read the whole table, `None` when it was never initialized
    async fn load(&self) -> Result<Option<Dataset>>;

    /// Persist `rows` and return how many were written.
    ///
    /// With `init` the table is (re)created from `rows` alone. Otherwise the
    /// rows are appended, which fails when no table exists yet.
    async fn append(&self, rows: &[DatasetRow], init: bool) -> Result<usize>;

    /// Human readable location, used in logs and errors
    fn location(&self) -> String;
}

/// Port for the run ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the ledger, `None` when it does not exist
    async fn load(&self) -> Result<Option<Ledger>>;

    /// Persist entries following [`Ledger::append`] and return the new ledger
    async fn append(&self, entries: Vec<LedgerEntry>, init: bool, overwrite: bool) -> Result<Ledger>;

    /// Human readable location, used in logs and errors
    fn location(&self) -> String;
}
