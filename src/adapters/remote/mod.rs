//! Upstream REST services
//!
//! - [`RemoteClient`]: authenticated JSON GETs with retry and backoff
//! - [`RestPageFetcher`]: [`PageFetcher`](crate::core::pagination::PageFetcher)
//!   for a configured collection
//! - [`RestReferenceClient`]: [`ReferenceLookup`](crate::core::reference::ReferenceLookup)
//!   for reference entities

pub mod client;
pub mod fetcher;
pub mod reference;

pub use client::{RemoteClient, TENANT_HEADER, TOKEN_HEADER};
pub use fetcher::RestPageFetcher;
pub use reference::RestReferenceClient;
