//! Lazy page-by-page iteration over one source.

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::sync::Arc;

use super::BookCursor;
use crate::models::BookRecord;
use crate::sources::BookSource;

/// Where a pager is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    FetchingFirst,
    HasBuffer,
    FetchingNext,
    Exhausted,
}

/// Fetches a query's results one page at a time as they are consumed.
///
/// The first page is loaded by [`LazyPager::start`]. Consuming the last
/// buffered record loads the following page straight away, so
/// [`has_next`](BookCursor::has_next) is always accurate. The pager is
/// exhausted by an empty page (which is also what a failed fetch looks
/// like) or after `max_pages` pages.
#[derive(Debug)]
pub struct LazyPager {
    source: Arc<dyn BookSource>,
    query: String,
    page_size: usize,
    max_pages: usize,
    pages_loaded: usize,
    next_offset: usize,
    buffer: Vec<BookRecord>,
    buffer_index: usize,
    yielded: usize,
    state: PagerState,
}

impl LazyPager {
    /// Create a pager and load its first page
    pub async fn start(
        source: Arc<dyn BookSource>,
        query: impl Into<String>,
        page_size: usize,
        max_pages: usize,
    ) -> Self {
        let mut pager = Self {
            source,
            query: query.into(),
            page_size,
            max_pages,
            pages_loaded: 0,
            next_offset: 0,
            buffer: Vec::new(),
            buffer_index: 0,
            yielded: 0,
            state: PagerState::FetchingFirst,
        };
        pager.load_first().await;
        pager
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Pages fetched since the last reset
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Next record without advancing
    pub fn peek(&self) -> Option<&BookRecord> {
        self.buffer.get(self.buffer_index)
    }

    async fn load_first(&mut self) {
        self.pages_loaded = 0;
        self.next_offset = 0;
        self.buffer.clear();
        self.buffer_index = 0;
        self.yielded = 0;

        if self.page_size == 0 || self.max_pages == 0 {
            self.state = PagerState::Exhausted;
            return;
        }

        self.state = PagerState::FetchingFirst;
        self.load_page().await;
    }

    async fn load_next(&mut self) {
        if self.pages_loaded >= self.max_pages {
            tracing::debug!(source = self.source.id(), pages = self.pages_loaded, "page limit reached");
            self.buffer.clear();
            self.buffer_index = 0;
            self.state = PagerState::Exhausted;
            return;
        }

        self.state = PagerState::FetchingNext;
        self.load_page().await;
    }

    async fn load_page(&mut self) {
        // sources may return short pages (Google caps maxResults at 40)
        let offset = self.next_offset;
        let mut page = self
            .source
            .search_page(&self.query, offset, self.page_size)
            .await;
        page.truncate(self.page_size);

        self.buffer_index = 0;
        if page.is_empty() {
            tracing::debug!(source = self.source.id(), offset, "empty page, pager exhausted");
            self.buffer.clear();
            self.state = PagerState::Exhausted;
        } else {
            self.pages_loaded += 1;
            self.next_offset += page.len();
            self.buffer = page;
            self.state = PagerState::HasBuffer;
        }
    }

    /// Turn the pager into a stream of records
    pub fn into_stream(mut self) -> impl Stream<Item = BookRecord> + Send {
        async_stream::stream! {
            while let Some(record) = self.next_record().await {
                yield record;
            }
        }
    }
}

#[async_trait]
impl BookCursor for LazyPager {
    async fn next_record(&mut self) -> Option<BookRecord> {
        if !self.has_next() {
            return None;
        }

        let record = self.buffer[self.buffer_index].clone();
        self.buffer_index += 1;
        self.yielded += 1;

        if self.buffer_index == self.buffer.len() {
            self.load_next().await;
        }
        Some(record)
    }

    fn has_next(&self) -> bool {
        self.state != PagerState::Exhausted && self.buffer_index < self.buffer.len()
    }

    async fn reset(&mut self) {
        self.load_first().await;
    }

    fn position(&self) -> usize {
        self.yielded
    }
}
