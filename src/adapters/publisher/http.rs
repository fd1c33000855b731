//! HTTP status publisher

use super::StatusPublisher;
use crate::adapters::remote::client::{check_status, map_send_error, retry_request};
use crate::adapters::remote::TENANT_HEADER;
use crate::config::{PublisherConfig, RemoteConfig, RetryConfig};
use crate::domain::{FerryError, Job, JobId, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Header carrying the record key
pub const KEY_HEADER: &str = "x-message-key";

/// POSTs status records as JSON to `<endpoint>/<topic>`
#[derive(Debug, Clone)]
pub struct HttpStatusPublisher {
    client: Client,
    url: String,
    tenant: Option<String>,
    retry: RetryConfig,
}

impl HttpStatusPublisher {
    /// # Errors
    ///
    /// Returns [`FerryError::Configuration`] when no endpoint is configured
    /// or the HTTP client cannot be built.
    pub fn new(config: &PublisherConfig, remote: &RemoteConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                FerryError::Configuration("publisher.endpoint is not set".to_string())
            })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FerryError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                config.topic.trim_start_matches('/')
            ),
            tenant: remote.tenant.clone(),
            retry: remote.retry.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusPublisher for HttpStatusPublisher {
    async fn publish(&self, key: &JobId, job: &Job) -> Result<()> {
        retry_request(&self.retry, || async {
            let mut request = self
                .client
                .post(&self.url)
                .header(KEY_HEADER, key.as_str())
                .json(job);
            if let Some(tenant) = &self.tenant {
                request = request.header(TENANT_HEADER, tenant);
            }

            let response = request.send().await.map_err(map_send_error)?;
            check_status(response).await.map(|_| ())
        })
        .await
        .map_err(|e| FerryError::Publication(format!("POST {} failed: {}", self.url, e)))
    }
}
