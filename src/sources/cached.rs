//! Caching decorator for catalog sources.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::models::BookRecord;
use crate::sources::{BookSource, SourceCapabilities, SourceError};
use crate::utils::{CacheResult, CachedValue, SearchCache};

/// Wraps a source and remembers its successful answers.
///
/// Identity, capabilities and normalization are delegated unchanged. Only
/// `Ok` results are stored, so a failed call is retried on the next lookup.
#[derive(Debug, Clone)]
pub struct CachedSource {
    inner: Arc<dyn BookSource>,
    cache: Arc<SearchCache>,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn BookSource>, cache: Arc<SearchCache>) -> Self {
        Self { inner, cache }
    }

    /// The wrapped source
    pub fn inner(&self) -> &Arc<dyn BookSource> {
        &self.inner
    }

    fn cached(&self, key: &str) -> Option<CachedValue> {
        match self.cache.get(key) {
            CacheResult::Hit(value) => Some(value),
            CacheResult::Miss | CacheResult::Expired => None,
        }
    }

    async fn single(
        &self,
        operation: &str,
        input: &str,
        fetch: impl std::future::Future<Output = Result<Option<BookRecord>, SourceError>>,
    ) -> Result<Option<BookRecord>, SourceError> {
        let key = SearchCache::key(self.inner.id(), operation, &[input]);
        if let Some(CachedValue::Single(record)) = self.cached(&key) {
            return Ok(record);
        }

        let record = fetch.await?;
        self.cache.insert(key, CachedValue::Single(record.clone()));
        Ok(record)
    }
}

#[async_trait]
impl BookSource for CachedSource {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.inner.capabilities()
    }

    fn normalize(&self, raw: &Value) -> Result<BookRecord, SourceError> {
        self.inner.normalize(raw)
    }

    async fn try_search_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<BookRecord>, SourceError> {
        let (offset_text, limit_text) = (offset.to_string(), limit.to_string());
        let key = SearchCache::key(self.inner.id(), "page", &[query, &offset_text, &limit_text]);
        if let Some(CachedValue::Records(records)) = self.cached(&key) {
            return Ok(records);
        }

        let records = self.inner.try_search_page(query, offset, limit).await?;
        self.cache.insert(key, CachedValue::Records(records.clone()));
        Ok(records)
    }

    async fn try_search_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, SourceError> {
        self.single("isbn", isbn, self.inner.try_search_by_isbn(isbn)).await
    }

    async fn try_fetch_by_id(&self, id: &str) -> Result<Option<BookRecord>, SourceError> {
        self.single("id", id, self.inner.try_fetch_by_id(id)).await
    }
}
