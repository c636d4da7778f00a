use crate::credential::ApiKey;
use crate::ports::UpstreamSource;
use crate::request::{route_url, DataRequest};
use crate::response::{parse_coverage, parse_data_envelope, Coverage, DataResponse};
use async_trait::async_trait;
use hourfill_core::error::{HourfillError, Result};
use reqwest::Url;
use std::time::Duration;

/// EIA open data (v2) client
pub struct EiaClient {
    /// Base URL, e.g. "https://api.eia.gov/v2/"
    base_url: String,

    api_key: ApiKey,

    /// HTTP client
    client: reqwest::Client,
}

impl EiaClient {
    pub fn new(base_url: impl Into<String>, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HourfillError::Upstream {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.into(),
            api_key,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authenticated(&self, mut url: Url) -> Url {
        url.query_pairs_mut()
            .append_pair("api_key", self.api_key.expose());
        url
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        let shown = url.to_string();
        tracing::debug!(url = %shown, "GET");

        // reqwest errors carry the full URL, credential included, so strip it
        let response = self
            .client
            .get(self.authenticated(url))
            .send()
            .await
            .map_err(|e| HourfillError::Upstream {
                reason: format!("Request to {} failed: {}", shown, e.without_url()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HourfillError::Upstream {
                reason: format!("{} returned {}: {}", shown, status, truncate(&body, 200)),
            });
        }

        response.json().await.map_err(|e| HourfillError::Upstream {
            reason: format!("Failed to decode response from {}: {}", shown, e.without_url()),
        })
    }
}

#[async_trait]
impl UpstreamSource for EiaClient {
    async fn fetch(&self, request: &DataRequest) -> Result<DataResponse> {
        let url = request.url(&self.base_url)?;
        let shown = url.to_string();

        let body = self.get_json(url).await?;
        let (records, total) = parse_data_envelope(body)?;

        Ok(DataResponse {
            records,
            total,
            url: shown,
            request: request.clone(),
        })
    }

    async fn coverage(&self, api_path: &str) -> Result<Coverage> {
        let url = route_url(&self.base_url, api_path)?;
        parse_coverage(self.get_json(url).await?)
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
