//! External system integrations for Ferry.
//!
//! - [`remote`] - upstream REST services (paged collections, reference entities)
//! - [`publisher`] - job status publication (HTTP, log, in-process channel)
//! - [`storage`] - output file storage and rollback snapshot restore
//!
//! Adapters isolate third-party clients behind the traits the core uses, so
//! the core can be exercised with in-memory implementations.
//!
//! ```rust,no_run
//! use ferry::adapters::remote::{RemoteClient, RestReferenceClient};
//! use ferry::config::RemoteConfig;
//! use ferry::core::reference::{ReferenceDataCache, ReferenceKind};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(RemoteClient::new(&RemoteConfig::default())?);
//! let cache = ReferenceDataCache::builder(Arc::new(RestReferenceClient::new(client))).build();
//! let book = cache.resolve_by_name(ReferenceKind::MaterialType, "book").await?;
//! println!("{}", book["id"]);
//! # Ok(())
//! # }
//! ```

pub mod publisher;
pub mod remote;
pub mod storage;
