//! Continuation-marker paginated source

use super::{PageFetcher, PagePosition, PageRequest, PaginatedSource, SourceState};
use crate::domain::Result;
use crate::log_page_fetched;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;

/// Paginated source driven by a server-supplied continuation marker
///
/// Reads the inclusive range `[start, end]`. The high-water mark starts at
/// `end`; each fetch asks for records in `[start, high-water mark]` and the
/// server's `next` marker replaces the high-water mark. Once a page arrives
/// without a marker, its records are still handed out, after which the
/// source is exhausted and never fetches again.
///
/// An empty page that still carries a marker is fetched past. An empty page
/// whose marker equals the current high-water mark would repeat forever, so
/// it ends the stream with a warning.
pub struct CursorPaginatedSource<R> {
    fetcher: Arc<dyn PageFetcher<R>>,
    label: String,
    page_size: usize,
    start: String,
    high_water_mark: Option<String>,
    buffer: VecDeque<R>,
    fetch_count: u64,
    state: SourceState,
}

impl<R: Send> CursorPaginatedSource<R> {
    /// Create a source over `[start, end]`
    pub fn new(
        fetcher: Arc<dyn PageFetcher<R>>,
        page_size: usize,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            label: "cursor-source".to_string(),
            page_size: page_size.max(1),
            start: start.into(),
            high_water_mark: Some(end.into()),
            buffer: VecDeque::new(),
            fetch_count: 0,
            state: SourceState::Active,
        }
    }

    /// Name used in log output
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Marker the next fetch will use, `None` once the final page arrived
    pub fn high_water_mark(&self) -> Option<&str> {
        self.high_water_mark.as_deref()
    }

    /// Number of successful fetches so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == SourceState::Exhausted
    }

    /// Fetch until records arrive or the continuation signal runs out
    async fn fill_buffer(&mut self) -> Result<()> {
        while self.buffer.is_empty() {
            let Some(marker) = self.high_water_mark.clone() else {
                self.state = SourceState::Exhausted;
                return Ok(());
            };

            let request = PageRequest {
                limit: self.page_size,
                position: PagePosition::Cursor(marker.clone()),
                range_start: Some(self.start.clone()),
                range_end: Some(marker.clone()),
            };

            let page = match self.fetcher.fetch(&request).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        source = %self.label,
                        marker = %marker,
                        error = %e,
                        "Page fetch failed, aborting source"
                    );
                    self.state = SourceState::Aborted(format!(
                        "{} failed at marker {}: {}",
                        self.label, marker, e
                    ));
                    return Err(e);
                }
            };

            log_page_fetched!(self.label, request.position, page.records.len());
            self.fetch_count += 1;

            if page.records.is_empty() && page.next.as_deref() == Some(marker.as_str()) {
                tracing::warn!(
                    source = %self.label,
                    marker = %marker,
                    "Empty page did not move the continuation marker, ending stream"
                );
                self.high_water_mark = None;
                self.state = SourceState::Exhausted;
                return Ok(());
            }

            self.high_water_mark = page.next;
            self.buffer = page.records.into();
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Send> PaginatedSource<R> for CursorPaginatedSource<R> {
    async fn next(&mut self) -> Result<Option<R>> {
        if let Some(result) = self.state.check() {
            return result;
        }

        if self.buffer.is_empty() {
            self.fill_buffer().await?;
        }

        match self.buffer.pop_front() {
            Some(record) => Ok(Some(record)),
            None => {
                self.state = SourceState::Exhausted;
                Ok(None)
            }
        }
    }
}
