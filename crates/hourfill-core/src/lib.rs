//! Hourfill Core - Domain models, run ledger, and configuration
//!
//! This crate contains the backfill/refresh domain logic that does not touch
//! the network or the filesystem: chunk planning, series assembly, ledger
//! bookkeeping, and the layered configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod processing;

pub use error::{HourfillError, Result};
