//! REST lookup of reference entities

use super::client::RemoteClient;
use crate::core::reference::{Entity, ReferenceKind, ReferenceLookup};
use crate::domain::{FerryError, RemoteError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const QUERY_LIMIT: usize = 1000;

/// [`ReferenceLookup`] over the upstream REST API
#[derive(Debug, Clone)]
pub struct RestReferenceClient {
    client: Arc<RemoteClient>,
}

impl RestReferenceClient {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReferenceLookup for RestReferenceClient {
    async fn get_by_id(&self, kind: ReferenceKind, id: &str) -> Result<Entity> {
        let path = format!("{}/{}", kind.path(), id);
        self.client
            .get_json(&path, &[])
            .await?
            .ok_or_else(|| FerryError::not_found(kind.to_string(), id))
    }

    async fn get_by_query(&self, kind: ReferenceKind, query: &str) -> Result<Vec<Entity>> {
        let params = [
            ("query".to_string(), query.to_string()),
            ("limit".to_string(), QUERY_LIMIT.to_string()),
        ];

        let Some(body) = self.client.get_json(kind.path(), &params).await? else {
            return Err(RemoteError::ClientError {
                status: 404,
                message: format!("Collection {} not found", kind.path()),
            }
            .into());
        };

        match body.get(kind.collection_field()) {
            Some(Value::Array(entities)) => Ok(entities.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(RemoteError::InvalidResponse(format!(
                "Field '{}' is not an array: {}",
                kind.collection_field(),
                other
            ))
            .into()),
        }
    }
}
