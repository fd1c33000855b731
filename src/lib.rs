// Ferry - Batch Export Worker
// Copyright (c) 2025 Ferry Contributors
// Licensed under the MIT License

//! # Ferry - Batch Export Worker
//!
//! Ferry runs export jobs against paginated REST collections, enriches the
//! records through a bounded reference-data cache, and reports job status
//! when each run finishes.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Paging** through remote collections by offset or continuation cursor
//! - **Resolving** reference entities (users, locations, service points...)
//!   through a per-kind bounded cache
//! - **Tracking** which execution runs each job id
//! - **Notifying** downstream consumers with a job status record when a run
//!   ends, after acknowledging the request and removing temp files
//! - **Rolling back** update jobs by stopping them and restoring a snapshot
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Job runner, sources, cache, lifecycle and rollback
//! - [`adapters`] - REST client, status publishers, file storage
//! - [`domain`] - Errors, identifiers and the job status record
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferry::adapters::remote::{RemoteClient, RestPageFetcher};
//! use ferry::config::load_config;
//! use ferry::core::pagination::{OffsetPaginatedSource, PaginatedSource};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ferry.toml")?;
//! let client = Arc::new(RemoteClient::new(&config.remote)?);
//! let fetcher = Arc::new(RestPageFetcher::new(client, "audit-data/circulation/logs"));
//!
//! let mut source = OffsetPaginatedSource::new(fetcher, 100);
//! while let Some(record) = source.next().await? {
//!     println!("{record}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Reference Data
//!
//! ```rust,no_run
//! use ferry::core::reference::{ReferenceDataCache, ReferenceKind, ReferenceLookup};
//! use std::sync::Arc;
//!
//! # async fn example(lookup: Arc<dyn ReferenceLookup>) -> ferry::domain::Result<()> {
//! let cache = ReferenceDataCache::builder(lookup)
//!     .capacity(ReferenceKind::User, 5000)
//!     .build();
//!
//! let user = cache.resolve_by_name(ReferenceKind::User, "jdoe").await?;
//! println!("{}", user["id"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Ferry uses [`domain::FerryError`] for all library errors:
//!
//! ```rust,no_run
//! use ferry::domain::FerryError;
//!
//! fn example() -> Result<(), FerryError> {
//!     let config = ferry::config::load_config("ferry.toml")?;
//!     config.validate().map_err(FerryError::Configuration)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Ferry uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(job_id = "J1", "Starting export");
//! warn!(source = "circulation-log", "Empty page with unchanged cursor");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
