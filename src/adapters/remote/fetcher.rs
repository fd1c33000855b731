//! REST page fetcher for paginated collections

use super::client::RemoteClient;
use crate::config::SourceConfig;
use crate::core::pagination::{Page, PageFetcher, PagePosition, PageRequest};
use crate::domain::{FerryError, RemoteError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fetches pages of JSON records from one collection path
///
/// Offset pages are requested with `offset` and `limit`. Cursor pages send
/// the fixed range start as `fromDate` and the current marker as `toDate`.
///
/// # Example
///
/// ```no_run
/// use ferry::adapters::remote::{RemoteClient, RestPageFetcher};
/// use ferry::config::RemoteConfig;
/// use std::sync::Arc;
///
/// # fn example() -> ferry::domain::Result<()> {
/// let client = Arc::new(RemoteClient::new(&RemoteConfig::default())?);
/// let fetcher = RestPageFetcher::new(client, "audit-data/circulation/logs")
///     .records_field("logRecords");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RestPageFetcher {
    client: Arc<RemoteClient>,
    path: String,
    records_field: String,
    next_field: String,
    query: Option<String>,
    params: BTreeMap<String, String>,
}

impl RestPageFetcher {
    pub fn new(client: Arc<RemoteClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            records_field: "records".to_string(),
            next_field: "next".to_string(),
            query: None,
            params: BTreeMap::new(),
        }
    }

    pub fn from_source(client: Arc<RemoteClient>, source: &SourceConfig) -> Self {
        let mut fetcher = Self::new(client, &source.path)
            .records_field(&source.records_field)
            .next_field(&source.next_field)
            .query(source.query.clone());
        fetcher.params = source.params.clone();
        fetcher
    }

    pub fn records_field(mut self, field: impl Into<String>) -> Self {
        self.records_field = field.into();
        self
    }

    pub fn next_field(mut self, field: impl Into<String>) -> Self {
        self.next_field = field.into();
        self
    }

    pub fn query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.trim().is_empty());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn query_params(&self, request: &PageRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.push(("limit".to_string(), request.limit.to_string()));

        match &request.position {
            PagePosition::Offset(offset) => {
                params.push(("offset".to_string(), offset.to_string()));
                if let Some(start) = &request.range_start {
                    params.push(("fromDate".to_string(), start.clone()));
                }
                if let Some(end) = &request.range_end {
                    params.push(("toDate".to_string(), end.clone()));
                }
            }
            PagePosition::Cursor(marker) => {
                if let Some(start) = &request.range_start {
                    params.push(("fromDate".to_string(), start.clone()));
                }
                params.push(("toDate".to_string(), marker.clone()));
            }
        }

        if let Some(query) = &self.query {
            params.push(("query".to_string(), query.clone()));
        }
        params
    }

    fn parse_page(&self, body: Value) -> Result<Page<Value>> {
        let Value::Object(mut body) = body else {
            return Err(RemoteError::InvalidResponse(format!(
                "Expected a JSON object from {}",
                self.path
            ))
            .into());
        };

        let records = match body.remove(&self.records_field) {
            Some(Value::Array(records)) => records,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(RemoteError::InvalidResponse(format!(
                    "Field '{}' of {} is not an array: {}",
                    self.records_field, self.path, other
                ))
                .into())
            }
        };

        let next = match body.remove(&self.next_field) {
            Some(Value::String(marker)) if !marker.is_empty() => Some(marker),
            Some(Value::Number(marker)) => Some(marker.to_string()),
            _ => None,
        };

        Ok(Page::new(records, next))
    }
}

#[async_trait]
impl PageFetcher<Value> for RestPageFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page<Value>> {
        let params = self.query_params(request);
        let body = self
            .client
            .get_json(&self.path, &params)
            .await?
            .ok_or_else(|| FerryError::not_found("Collection", self.path.clone()))?;

        self.parse_page(body)
    }
}
