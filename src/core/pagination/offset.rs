//! Offset/limit paginated source

use super::{PageFetcher, PagePosition, PageRequest, PaginatedSource, SourceState};
use crate::domain::Result;
use crate::log_page_fetched;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;

/// Offset/limit paginated source
///
/// After every fetch the offset advances by the page size, whatever the
/// server returned. If the remote collection shrinks between two fetches the
/// stream can therefore skip records, and if it grows it can repeat them.
/// Exports read a collection that is not expected to change mid-job, so the
/// stride is kept fixed instead of following the returned count.
///
/// A page longer than the page size is cut to the page size, so records
/// past the stride are dropped and come back with the next offset.
///
/// An empty page ends the stream, as does reaching `max_items`.
pub struct OffsetPaginatedSource<R> {
    fetcher: Arc<dyn PageFetcher<R>>,
    label: String,
    page_size: usize,
    offset: u64,
    max_items: Option<u64>,
    range_start: Option<String>,
    range_end: Option<String>,
    buffer: VecDeque<R>,
    delivered: u64,
    fetch_count: u64,
    state: SourceState,
}

impl<R: Send> OffsetPaginatedSource<R> {
    /// Create a source that starts at offset 0
    ///
    /// A page size of 0 is bumped to 1.
    pub fn new(fetcher: Arc<dyn PageFetcher<R>>, page_size: usize) -> Self {
        Self {
            fetcher,
            label: "offset-source".to_string(),
            page_size: page_size.max(1),
            offset: 0,
            max_items: None,
            range_start: None,
            range_end: None,
            buffer: VecDeque::new(),
            delivered: 0,
            fetch_count: 0,
            state: SourceState::Active,
        }
    }

    pub fn start_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Cap on delivered records
    pub fn max_items(mut self, max_items: Option<u64>) -> Self {
        self.max_items = max_items;
        self
    }

    /// Range bounds forwarded with every request
    pub fn range(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.range_start = start;
        self.range_end = end;
        self
    }

    /// Name used in log output
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Offset the next fetch will use
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of successful fetches so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count
    }

    /// Number of records handed out so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == SourceState::Exhausted
    }

    async fn fill_buffer(&mut self) -> Result<()> {
        let request = PageRequest {
            limit: self.page_size,
            position: PagePosition::Offset(self.offset),
            range_start: self.range_start.clone(),
            range_end: self.range_end.clone(),
        };

        let page = match self.fetcher.fetch(&request).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(
                    source = %self.label,
                    offset = self.offset,
                    error = %e,
                    "Page fetch failed, aborting source"
                );
                self.state = SourceState::Aborted(format!(
                    "{} failed at offset {}: {}",
                    self.label, self.offset, e
                ));
                return Err(e);
            }
        };

        log_page_fetched!(self.label, request.position, page.records.len());

        self.offset += self.page_size as u64;
        self.fetch_count += 1;

        let mut records = page.records;
        if records.len() > self.page_size {
            tracing::warn!(
                source = %self.label,
                returned = records.len(),
                page_size = self.page_size,
                "Server returned more records than requested, truncating"
            );
            records.truncate(self.page_size);
        }

        if records.is_empty() {
            self.state = SourceState::Exhausted;
        }
        self.buffer = records.into();
        Ok(())
    }
}

#[async_trait]
impl<R: Send> PaginatedSource<R> for OffsetPaginatedSource<R> {
    async fn next(&mut self) -> Result<Option<R>> {
        if let Some(result) = self.state.check() {
            return result;
        }

        if let Some(max) = self.max_items {
            if self.delivered >= max {
                self.state = SourceState::Exhausted;
                self.buffer.clear();
                return Ok(None);
            }
        }

        if self.buffer.is_empty() {
            self.fill_buffer().await?;
        }

        match self.buffer.pop_front() {
            Some(record) => {
                self.delivered += 1;
                Ok(Some(record))
            }
            None => {
                self.state = SourceState::Exhausted;
                Ok(None)
            }
        }
    }
}
