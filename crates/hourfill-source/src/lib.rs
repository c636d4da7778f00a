//! Hourfill Source - Upstream data port and the EIA v2 adapter
//!
//! This crate defines the port the fetcher talks to, the credential and
//! request types, and an HTTP implementation for the EIA open data API.

pub mod credential;
pub mod eia;
pub mod ports;
pub mod request;
pub mod response;

// Re-export main types
pub use credential::ApiKey;
pub use eia::EiaClient;
pub use ports::UpstreamSource;
pub use request::DataRequest;
pub use response::{Coverage, DataResponse, Record};
