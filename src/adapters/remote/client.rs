//! Shared HTTP plumbing for upstream REST services

use crate::config::{RemoteConfig, RetryConfig, SecretString};
use crate::domain::{FerryError, RemoteError, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;

/// Tenant header sent with every request
pub const TENANT_HEADER: &str = "x-okapi-tenant";
/// Token header sent with every request
pub const TOKEN_HEADER: &str = "x-okapi-token";

/// Authenticated JSON client bound to one base URL
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    tenant: Option<String>,
    token: Option<SecretString>,
    retry: RetryConfig,
}

impl RemoteClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::Configuration`] if the HTTP client cannot be built
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FerryError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tenant: config.tenant.clone(),
            token: config.token.clone(),
            retry: config.retry.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(tenant) = &self.tenant {
            request = request.header(TENANT_HEADER, tenant);
        }
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token.expose_secret().as_ref());
        }
        request
    }

    /// GET a JSON document, `Ok(None)` on 404
    ///
    /// Connection failures, timeouts and 5xx responses are retried with
    /// exponential backoff.
    pub async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Option<Value>> {
        let url = self.url(path);

        retry_request(&self.retry, || async {
            let request = self.authorize(self.client.get(&url).query(query));
            let response = request.send().await.map_err(map_send_error)?;

            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = check_status(response).await?;

            response
                .json::<Value>()
                .await
                .map(Some)
                .map_err(|e| FerryError::from(RemoteError::InvalidResponse(e.to_string())))
        })
        .await
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .field("tenant", &self.tenant)
            .finish()
    }
}

/// Map a transport error to a [`RemoteError`]
pub(crate) fn map_send_error(error: reqwest::Error) -> FerryError {
    if error.is_timeout() {
        RemoteError::Timeout(error.to_string()).into()
    } else {
        RemoteError::ConnectionFailed(error.to_string()).into()
    }
}

/// Turn a non-success response into a [`RemoteError`]
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    let status = status.as_u16();
    let error = if status >= 500 {
        RemoteError::ServerError { status, message }
    } else {
        RemoteError::ClientError { status, message }
    };
    Err(error.into())
}

/// Whether another attempt could succeed
fn is_retryable(error: &FerryError) -> bool {
    matches!(
        error,
        FerryError::RemoteUnavailable(
            RemoteError::ConnectionFailed(_)
                | RemoteError::Timeout(_)
                | RemoteError::ServerError { .. }
        )
    )
}

/// Retry a request with exponential backoff
///
/// `max_retries` counts every attempt including the first. Errors that a
/// retry cannot fix are returned immediately.
pub(crate) async fn retry_request<F, T, Fut>(retry: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_retries = retry.max_retries.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if attempt >= max_retries || !is_retryable(&e) {
                    return Err(e);
                }

                let delay = retry.delay_for(attempt);
                crate::log_retry_attempt!(attempt, max_retries, e);
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off");

                tokio::time::sleep(delay).await;
            }
        }
    }
}
