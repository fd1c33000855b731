//! Read-through cache of reference entities

use super::{Entity, ReferenceKind, ReferenceLookup};
use crate::domain::{FerryError, Result};
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// One independently sized cache per reference kind
struct Partition {
    by_id: Cache<String, Entity>,
    by_name: Cache<String, Arc<Vec<Entity>>>,
}

impl Partition {
    fn new(capacity: u64, ttl: Option<Duration>) -> Self {
        let mut by_id = Cache::builder().max_capacity(capacity);
        let mut by_name = Cache::builder().max_capacity(capacity);
        if let Some(ttl) = ttl {
            by_id = by_id.time_to_live(ttl);
            by_name = by_name.time_to_live(ttl);
        }
        Self {
            by_id: by_id.build(),
            by_name: by_name.build(),
        }
    }
}

/// Read-through cache for reference data, shared by all jobs in the process
///
/// Lookups never coalesce: two tasks missing on the same key both call
/// upstream and the last insert wins. Failed lookups are never cached.
///
/// # Example
///
/// ```no_run
/// use ferry::core::reference::{ReferenceDataCache, ReferenceKind, ReferenceLookup};
/// use std::sync::Arc;
///
/// # async fn example(lookup: Arc<dyn ReferenceLookup>) -> ferry::domain::Result<()> {
/// let cache = ReferenceDataCache::builder(lookup)
///     .default_capacity(500)
///     .capacity(ReferenceKind::User, 5_000)
///     .build();
///
/// let book = cache.resolve_by_name(ReferenceKind::MaterialType, "book").await?;
/// println!("{}", book["id"]);
/// # Ok(())
/// # }
/// ```
pub struct ReferenceDataCache {
    lookup: Arc<dyn ReferenceLookup>,
    partitions: HashMap<ReferenceKind, Partition>,
    counters: Counters,
}

impl ReferenceDataCache {
    pub fn builder(lookup: Arc<dyn ReferenceLookup>) -> ReferenceDataCacheBuilder {
        ReferenceDataCacheBuilder::new(lookup)
    }

    fn partition(&self, kind: ReferenceKind) -> Result<&Partition> {
        self.partitions
            .get(&kind)
            .ok_or_else(|| FerryError::Configuration(format!("No cache partition for {kind}")))
    }

    /// Resolve an entity by id, fetching it on a miss
    ///
    /// # Errors
    ///
    /// Propagates upstream failures uncached. An id the remote service does
    /// not know surfaces as [`FerryError::NotFound`].
    pub async fn resolve_by_id(&self, kind: ReferenceKind, id: &str) -> Result<Entity> {
        let partition = self.partition(kind)?;

        if let Some(entity) = partition.by_id.get(id).await {
            self.counters.hit();
            return Ok(entity);
        }
        self.counters.miss();

        let entity = self.lookup.get_by_id(kind, id).await?;
        partition.by_id.insert(id.to_string(), entity.clone()).await;

        tracing::debug!(kind = %kind, id = %id, "Cached reference entity by id");
        Ok(entity)
    }

    /// Resolve the first entity whose query field equals `name`
    ///
    /// On a miss the whole upstream result is cached under `(kind, name)`,
    /// so later lookups of the same name never call upstream again.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::NotFound`] when nothing matches; that outcome
    /// is not cached. Upstream failures propagate uncached.
    pub async fn resolve_by_name(&self, kind: ReferenceKind, name: &str) -> Result<Entity> {
        let matches = self.resolve_all_by_name(kind, name).await?;
        matches
            .first()
            .cloned()
            .ok_or_else(|| FerryError::not_found(kind.to_string(), name))
    }

    /// Every entity matching `name`, in upstream order
    ///
    /// An empty match is returned as [`FerryError::NotFound`] and not cached.
    pub async fn resolve_all_by_name(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Arc<Vec<Entity>>> {
        let partition = self.partition(kind)?;

        if let Some(matches) = partition.by_name.get(name).await {
            self.counters.hit();
            return Ok(matches);
        }
        self.counters.miss();

        let query = kind.exact_match_query(name);
        let matches = self.lookup.get_by_query(kind, &query).await?;

        if matches.is_empty() {
            tracing::debug!(kind = %kind, name = %name, "Reference lookup matched nothing");
            return Err(FerryError::not_found(kind.to_string(), name));
        }

        let matches = Arc::new(matches);
        partition
            .by_name
            .insert(name.to_string(), Arc::clone(&matches))
            .await;

        tracing::debug!(
            kind = %kind,
            name = %name,
            matches = matches.len(),
            "Cached reference entities by name"
        );
        Ok(matches)
    }

    /// Hit/miss counters across all partitions
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Drop every cached entry of one kind
    pub fn invalidate_kind(&self, kind: ReferenceKind) {
        if let Some(partition) = self.partitions.get(&kind) {
            partition.by_id.invalidate_all();
            partition.by_name.invalidate_all();
        }
    }
}

/// Builder for [`ReferenceDataCache`]
pub struct ReferenceDataCacheBuilder {
    lookup: Arc<dyn ReferenceLookup>,
    default_capacity: u64,
    capacities: HashMap<ReferenceKind, u64>,
    ttl: Option<Duration>,
}

impl ReferenceDataCacheBuilder {
    fn new(lookup: Arc<dyn ReferenceLookup>) -> Self {
        Self {
            lookup,
            default_capacity: 1_000,
            capacities: HashMap::new(),
            ttl: None,
        }
    }

    /// Capacity for kinds without an explicit size
    pub fn default_capacity(mut self, capacity: u64) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Capacity for one kind
    pub fn capacity(mut self, kind: ReferenceKind, capacity: u64) -> Self {
        self.capacities.insert(kind, capacity);
        self
    }

    /// Expire entries this long after insertion
    pub fn time_to_live(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn build(self) -> ReferenceDataCache {
        let partitions = ReferenceKind::ALL
            .into_iter()
            .map(|kind| {
                let capacity = self
                    .capacities
                    .get(&kind)
                    .copied()
                    .unwrap_or(self.default_capacity);
                (kind, Partition::new(capacity, self.ttl))
            })
            .collect();

        ReferenceDataCache {
            lookup: self.lookup,
            partitions,
            counters: Counters::default(),
        }
    }
}
