use crate::request::DataRequest;
use crate::response::{Coverage, DataResponse};
use async_trait::async_trait;
use hourfill_core::error::Result;

/// Port for the remote time-series API
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Execute one data query and return its raw rows
    async fn fetch(&self, request: &DataRequest) -> Result<DataResponse>;

    /// Report the available start/end periods of a dataset route
    async fn coverage(&self, api_path: &str) -> Result<Coverage>;
}
