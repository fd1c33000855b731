//! Reference data resolution
//!
//! Exports and updates translate between ids and human-readable names of
//! small reference entities (material types, loan types, users, ...). The
//! [`ReferenceDataCache`] sits in front of a [`ReferenceLookup`] so each
//! (kind, key) pair is fetched once per process.

pub mod cache;
pub mod kind;

pub use cache::{CacheStats, ReferenceDataCache, ReferenceDataCacheBuilder};
pub use kind::ReferenceKind;

use crate::domain::Result;
use async_trait::async_trait;

/// A resolved reference entity, kept as raw JSON
pub type Entity = serde_json::Value;

/// Remote access to reference collections
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Fetch one entity by id
    ///
    /// # Errors
    ///
    /// [`FerryError::NotFound`](crate::domain::FerryError::NotFound) when the
    /// id is unknown, [`FerryError::RemoteUnavailable`](crate::domain::FerryError::RemoteUnavailable)
    /// when the call fails.
    async fn get_by_id(&self, kind: ReferenceKind, id: &str) -> Result<Entity>;

    /// Run a query and return the matching entities in upstream order
    async fn get_by_query(&self, kind: ReferenceKind, query: &str) -> Result<Vec<Entity>>;
}
