//! CSV file storage adapters

mod atomic;
pub mod dataset;
pub mod ledger;
pub mod table;

pub use dataset::CsvDatasetStore;
pub use ledger::CsvLedgerStore;
