//! Ordered set of catalog sources.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{aggregate_with_cancel, AggregatedResults, CatalogError, LazyPager, ResultCursor};
use crate::models::BookRecord;
use crate::sources::{BookSource, SourceRegistry};

/// The sources a search runs against, in priority order
///
/// ```
/// use std::sync::Arc;
/// use bookfinder::catalog::BookCollection;
/// use bookfinder::sources::MockSource;
///
/// let collection = BookCollection::new()
///     .add_source(Arc::new(MockSource::new("first")))
///     .add_source(Arc::new(MockSource::new("second")));
/// assert_eq!(collection.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BookCollection {
    sources: Vec<Arc<dyn BookSource>>,
}

impl BookCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use every source of a registry, in registry order
    pub fn from_registry(registry: &SourceRegistry) -> Self {
        Self {
            sources: registry.to_vec(),
        }
    }

    /// Append a source
    pub fn add_source(mut self, source: Arc<dyn BookSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[Arc<dyn BookSource>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn source_at(&self, index: usize) -> Result<&Arc<dyn BookSource>, CatalogError> {
        if self.sources.is_empty() {
            return Err(CatalogError::NoSources);
        }
        self.sources.get(index).ok_or(CatalogError::SourceIndex {
            index,
            len: self.sources.len(),
        })
    }

    /// Fetch one page from one source and walk it in memory
    pub async fn cursor(
        &self,
        query: &str,
        source_index: usize,
        limit: usize,
    ) -> Result<ResultCursor, CatalogError> {
        let source = self.source_at(source_index)?;
        let records = source.search_by_query(query, limit).await;
        Ok(ResultCursor::new(records, source.id()))
    }

    /// Page lazily through one source
    pub async fn lazy(
        &self,
        query: &str,
        source_index: usize,
        page_size: usize,
        max_pages: usize,
    ) -> Result<LazyPager, CatalogError> {
        let source = self.source_at(source_index)?.clone();
        Ok(LazyPager::start(source, query, page_size, max_pages).await)
    }

    /// Search every source and merge the results
    pub async fn multi_source(
        &self,
        query: &str,
        limit_per_source: usize,
        dedupe: bool,
    ) -> Result<AggregatedResults, CatalogError> {
        self.multi_source_with_cancel(query, limit_per_source, dedupe, &CancellationToken::new())
            .await
    }

    pub async fn multi_source_with_cancel(
        &self,
        query: &str,
        limit_per_source: usize,
        dedupe: bool,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResults, CatalogError> {
        aggregate_with_cancel(&self.sources, query, limit_per_source, dedupe, cancel).await
    }

    /// First ISBN match, trying sources in order
    pub async fn find_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, CatalogError> {
        if self.sources.is_empty() {
            return Err(CatalogError::NoSources);
        }

        for source in &self.sources {
            if let Some(record) = source.search_by_isbn(isbn).await {
                return Ok(Some(record.tagged(source.id())));
            }
            tracing::debug!(source = source.id(), isbn, "no match, trying next source");
        }
        Ok(None)
    }
}
