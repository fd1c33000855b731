//! Paginated remote sources
//!
//! A [`PaginatedSource`] turns a series of bounded page fetches into one
//! pull-based stream of records. Two variants exist:
//!
//! - [`OffsetPaginatedSource`]: offset/limit paging with a fixed stride
//! - [`CursorPaginatedSource`]: continuation-marker paging between two
//!   inclusive range markers
//!
//! Both delegate the actual network call to a [`PageFetcher`] and share the
//! same contract: a single owner pulls with [`PaginatedSource::next`], the
//! source never rewinds, and once it has returned `Ok(None)` it stays
//! exhausted. A failed fetch propagates the error and leaves the source
//! aborted; later calls report [`FerryError::SourceAborted`].
//!
//! # Example
//!
//! ```no_run
//! use ferry::core::pagination::{OffsetPaginatedSource, PageFetcher, PaginatedSource};
//! use std::sync::Arc;
//!
//! # async fn example(fetcher: Arc<dyn PageFetcher<serde_json::Value>>) -> ferry::domain::Result<()> {
//! let mut source = OffsetPaginatedSource::new(fetcher, 100).max_items(Some(1000));
//! while let Some(record) = source.next().await? {
//!     println!("{record}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod offset;

pub use cursor::CursorPaginatedSource;
pub use offset::OffsetPaginatedSource;

use crate::domain::{FerryError, Result};
use async_trait::async_trait;
use std::fmt;

/// Where a page starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePosition {
    /// Number of records to skip
    Offset(u64),
    /// Continuation marker (upper bound of the remaining range)
    Cursor(String),
}

impl fmt::Display for PagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagePosition::Offset(offset) => write!(f, "offset {offset}"),
            PagePosition::Cursor(marker) => write!(f, "cursor {marker}"),
        }
    }
}

/// One page request handed to a [`PageFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub position: PagePosition,
    /// Inclusive lower bound of the requested range, if any
    pub range_start: Option<String>,
    /// Inclusive upper bound of the requested range, if any
    pub range_end: Option<String>,
}

/// One page returned by a [`PageFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// Continuation marker; `None` means there is nothing after this page
    pub next: Option<String>,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>, next: Option<String>) -> Self {
        Self { records, next }
    }

    /// A page with no continuation marker
    pub fn last(records: Vec<R>) -> Self {
        Self::new(records, None)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetches one page of records from a remote collection
#[async_trait]
pub trait PageFetcher<R>: Send + Sync {
    /// Fetch the page described by `request`
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::RemoteUnavailable`] when the upstream call fails.
    async fn fetch(&self, request: &PageRequest) -> Result<Page<R>>;
}

/// Pull-based stream of records backed by page fetches
#[async_trait]
pub trait PaginatedSource<R>: Send {
    /// Next record, `Ok(None)` once the source is exhausted
    async fn next(&mut self) -> Result<Option<R>>;
}

/// Lifecycle of a source, shared by both variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SourceState {
    Active,
    Exhausted,
    Aborted(String),
}

impl SourceState {
    /// Short-circuit for sources that can no longer fetch
    pub(crate) fn check<R>(&self) -> Option<Result<Option<R>>> {
        match self {
            SourceState::Active => None,
            SourceState::Exhausted => Some(Ok(None)),
            SourceState::Aborted(reason) => {
                Some(Err(FerryError::SourceAborted(reason.clone())))
            }
        }
    }
}
