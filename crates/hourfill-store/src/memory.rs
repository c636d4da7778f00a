//! In-memory storage implementations for development and testing.

use async_trait::async_trait;
use hourfill_core::error::Result;
use hourfill_core::models::{Dataset, DatasetRow, Ledger, LedgerEntry};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{DatasetStore, LedgerStore};

const DATASET_LOCATION: &str = "memory://dataset";
const LEDGER_LOCATION: &str = "memory://ledger";

/// In-memory implementation of DatasetStore
#[derive(Debug, Clone, Default)]
pub struct MemoryDatasetStore {
    dataset: Arc<RwLock<Option<Dataset>>>,
}

impl MemoryDatasetStore {
    /// Create an empty, uninitialized store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an existing table
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(Some(dataset))),
        }
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn load(&self) -> Result<Option<Dataset>> {
        Ok(self.dataset.read().await.clone())
    }

    async fn append(&self, rows: &[DatasetRow], init: bool) -> Result<usize> {
        let mut slot = self.dataset.write().await;
        let dataset = Dataset::append(slot.clone(), rows.to_vec(), init)?;
        *slot = Some(dataset);
        Ok(rows.len())
    }

    fn location(&self) -> String {
        DATASET_LOCATION.to_string()
    }
}

/// In-memory implementation of LedgerStore
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    ledger: Arc<RwLock<Option<Ledger>>>,
}

impl MemoryLedgerStore {
    /// Create a store with no ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an existing ledger
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Some(ledger))),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self) -> Result<Option<Ledger>> {
        Ok(self.ledger.read().await.clone())
    }

    async fn append(&self, entries: Vec<LedgerEntry>, init: bool, overwrite: bool) -> Result<Ledger> {
        let mut slot = self.ledger.write().await;
        let ledger = Ledger::append(slot.clone(), entries, init, overwrite, LEDGER_LOCATION)?;
        *slot = Some(ledger.clone());
        Ok(ledger)
    }

    fn location(&self) -> String {
        LEDGER_LOCATION.to_string()
    }
}
