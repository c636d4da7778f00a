//! Hourfill Store - Dataset and ledger ports and adapters
//!
//! This crate defines the storage ports the pipeline writes through and
//! provides in-memory and CSV file implementations.

pub mod file;
pub mod memory;
pub mod ports;

pub use file::{CsvDatasetStore, CsvLedgerStore};
pub use memory::{MemoryDatasetStore, MemoryLedgerStore};
pub use ports::{DatasetStore, LedgerStore};
