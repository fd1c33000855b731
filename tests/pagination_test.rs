//! Integration tests for offset and cursor paginated sources
//!
//! These tests verify that:
//! - The offset advances by exactly one page size per fetch
//! - Exhausted sources stay exhausted without fetching again
//! - A failed fetch aborts the source

use async_trait::async_trait;
use ferry::core::pagination::{
    CursorPaginatedSource, OffsetPaginatedSource, Page, PageFetcher, PagePosition, PageRequest,
    PaginatedSource,
};
use ferry::domain::{FerryError, RemoteError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves a fixed list by offset and records every request
struct CountingOffsetFetcher {
    items: Vec<u32>,
    requests: Mutex<Vec<PageRequest>>,
}

impl CountingOffsetFetcher {
    fn new(items: Vec<u32>) -> Arc<Self> {
        Arc::new(Self {
            items,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn offsets(&self) -> Vec<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| match r.position {
                PagePosition::Offset(offset) => offset,
                PagePosition::Cursor(_) => panic!("cursor request on offset fetcher"),
            })
            .collect()
    }
}

#[async_trait]
impl PageFetcher<u32> for CountingOffsetFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page<u32>> {
        self.requests.lock().unwrap().push(request.clone());
        let PagePosition::Offset(offset) = request.position else {
            panic!("cursor request on offset fetcher");
        };
        let records = self
            .items
            .iter()
            .skip(offset as usize)
            .take(request.limit)
            .copied()
            .collect();
        Ok(Page::last(records))
    }
}

/// Serves pre-scripted cursor pages in order
struct ScriptedCursorFetcher {
    pages: Mutex<Vec<Page<&'static str>>>,
    calls: AtomicUsize,
    markers: Mutex<Vec<String>>,
}

impl ScriptedCursorFetcher {
    fn new(mut pages: Vec<Page<&'static str>>) -> Arc<Self> {
        pages.reverse();
        Arc::new(Self {
            pages: Mutex::new(pages),
            calls: AtomicUsize::new(0),
            markers: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PageFetcher<&'static str> for ScriptedCursorFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page<&'static str>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let PagePosition::Cursor(marker) = &request.position {
            self.markers.lock().unwrap().push(marker.clone());
        }
        self.pages
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| RemoteError::InvalidResponse("no more pages".to_string()).into())
    }
}

async fn drain<R: Send>(source: &mut dyn PaginatedSource<R>) -> Vec<R> {
    let mut out = Vec::new();
    while let Some(record) = source.next().await.unwrap() {
        out.push(record);
    }
    out
}

#[tokio::test]
async fn test_offset_advances_by_page_size_per_fetch() {
    let fetcher = CountingOffsetFetcher::new((0..20).collect());
    let mut source = OffsetPaginatedSource::new(fetcher.clone(), 3).start_offset(5);

    // Three fetches: offsets 5, 8, 11
    for _ in 0..9 {
        source.next().await.unwrap().unwrap();
    }

    assert_eq!(source.fetch_count(), 3);
    assert_eq!(source.offset(), 5 + 3 * 3);
    assert_eq!(fetcher.offsets(), vec![5, 8, 11]);
}

#[tokio::test]
async fn test_offset_source_yields_every_item_then_none_forever() {
    let fetcher = CountingOffsetFetcher::new(vec![1, 2, 3, 4, 5]);
    let mut source = OffsetPaginatedSource::new(fetcher.clone(), 2);

    assert_eq!(drain(&mut source).await, vec![1, 2, 3, 4, 5]);

    let fetches = fetcher.offsets().len();
    for _ in 0..3 {
        assert_eq!(source.next().await.unwrap(), None);
    }
    assert_eq!(fetcher.offsets().len(), fetches);
    assert!(source.is_exhausted());
}

#[tokio::test]
async fn test_offset_source_honours_max_items() {
    let fetcher = CountingOffsetFetcher::new((0..10).collect());
    let mut source = OffsetPaginatedSource::new(fetcher, 4).max_items(Some(6));

    assert_eq!(drain(&mut source).await, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_offset_source_sends_range_with_every_request() {
    let fetcher = CountingOffsetFetcher::new(vec![1]);
    let mut source = OffsetPaginatedSource::new(fetcher.clone(), 5).range(
        Some("2024-01-01".to_string()),
        Some("2024-01-31".to_string()),
    );

    drain(&mut source).await;

    for request in fetcher.requests.lock().unwrap().iter() {
        assert_eq!(request.range_start.as_deref(), Some("2024-01-01"));
        assert_eq!(request.range_end.as_deref(), Some("2024-01-31"));
    }
}

#[tokio::test]
async fn test_cursor_source_stops_after_null_continuation() {
    let fetcher = ScriptedCursorFetcher::new(vec![
        Page::new(vec!["a", "b"], Some("2024-06-01".to_string())),
        Page::last(vec!["c"]),
    ]);
    let mut source = CursorPaginatedSource::new(fetcher.clone(), 2, "2024-01-01", "2024-12-31");

    assert_eq!(drain(&mut source).await, vec!["a", "b", "c"]);
    for _ in 0..3 {
        assert_eq!(source.next().await.unwrap(), None);
    }

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        *fetcher.markers.lock().unwrap(),
        vec!["2024-12-31".to_string(), "2024-06-01".to_string()]
    );
    assert!(source.high_water_mark().is_none());
}

#[tokio::test]
async fn test_cursor_source_ends_on_stuck_marker() {
    let fetcher = ScriptedCursorFetcher::new(vec![
        Page::new(vec!["a"], Some("m1".to_string())),
        Page::new(vec![], Some("m1".to_string())),
    ]);
    let mut source = CursorPaginatedSource::new(fetcher.clone(), 1, "m0", "m9");

    assert_eq!(drain(&mut source).await, vec!["a"]);
    assert_eq!(source.next().await.unwrap(), None);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_fetch_aborts_source() {
    let fetcher = ScriptedCursorFetcher::new(vec![Page::new(vec!["a"], Some("m1".to_string()))]);
    let mut source = CursorPaginatedSource::new(fetcher.clone(), 1, "m0", "m9");

    assert_eq!(source.next().await.unwrap(), Some("a"));
    let err = source.next().await.unwrap_err();
    assert!(matches!(err, FerryError::RemoteUnavailable(_)));

    // Aborted sources fail fast without fetching again
    assert!(source.next().await.is_err());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}
