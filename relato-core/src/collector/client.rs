//! HTTP client for the report collector endpoint

use std::time::Duration;

use async_trait::async_trait;

use crate::config::CollectorConfig;
use crate::error::{Error, Result};
use crate::types::ReportRecord;

use super::ReportTransport;

/// HTTP transport delivering reports to the configured collector URL
#[derive(Clone)]
pub struct CollectorClient {
    http_client: reqwest::Client,
    endpoint_url: String,
}

impl CollectorClient {
    /// Create a new collector client from configuration
    ///
    /// Returns an error if the configuration is invalid or has no endpoint.
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        config.validate()?;

        let endpoint_url = config
            .endpoint_url
            .clone()
            .ok_or_else(|| Error::Config("collector.endpoint_url is required".to_string()))?
            .trim()
            .to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint_url,
        })
    }

    /// Create a client only when an endpoint is configured.
    ///
    /// Returns `Ok(None)` when no endpoint is set; reports then accumulate
    /// locally until one is configured and a sync is triggered.
    pub fn from_config(config: &CollectorConfig) -> Result<Option<Self>> {
        if !config.is_ready() {
            return Ok(None);
        }
        Self::new(config).map(Some)
    }

    /// The endpoint this client delivers to
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Check whether the collector endpoint is reachable right now.
    ///
    /// Any HTTP response counts, whatever its status; this probes
    /// connectivity, not service health.
    pub async fn reachable(&self) -> bool {
        self.http_client
            .head(&self.endpoint_url)
            .send()
            .await
            .is_ok()
    }
}

#[async_trait]
impl ReportTransport for CollectorClient {
    /// POST one report as a JSON document; any 2xx response acknowledges it
    async fn deliver(&self, record: &ReportRecord) -> Result<()> {
        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Transmission(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            tracing::debug!(id = %record.id, "collector acknowledged report");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Transmission(format!(
                "collector error ({}): {}",
                status, error_text
            )))
        }
    }
}
