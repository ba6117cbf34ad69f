//! Mock source for testing purposes.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::BookRecord;
use crate::sources::{BookSource, SourceCapabilities, SourceError};

/// An in-memory source that serves a fixed record list.
///
/// Queries ignore the query text and page through the whole list, ISBN
/// lookups match the record ISBN, and ID lookups match the title. A
/// failing mock errors on every call, which the boundary methods turn into
/// empty results.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    records: Vec<BookRecord>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create an empty mock source with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Vec::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Serve these records, tagged with this source's id
    pub fn with_records(mut self, records: impl IntoIterator<Item = BookRecord>) -> Self {
        let id = self.id.clone();
        self.records = records.into_iter().map(|r| r.tagged(id.as_str())).collect();
        self
    }

    /// Fail every lookup
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Number of `try_*` calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            Err(SourceError::Network(format!("{} is unreachable", self.id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BookSource for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::all()
    }

    fn normalize(&self, raw: &Value) -> Result<BookRecord, SourceError> {
        let record: BookRecord = serde_json::from_value(raw.clone())?;
        Ok(record.tagged(self.id.as_str()))
    }

    async fn try_search_page(
        &self,
        _query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<BookRecord>, SourceError> {
        self.record_call()?;
        Ok(self.records.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn try_search_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, SourceError> {
        self.record_call()?;
        Ok(self
            .records
            .iter()
            .find(|r| r.dedup_key() == Some(isbn))
            .cloned())
    }

    async fn try_fetch_by_id(&self, id: &str) -> Result<Option<BookRecord>, SourceError> {
        self.record_call()?;
        Ok(self.records.iter().find(|r| r.title == id).cloned())
    }
}

/// Helper to create a record with an ISBN for tests.
pub fn make_record(title: &str, isbn: Option<&str>, source: &str) -> BookRecord {
    let mut record = BookRecord::new(title, source);
    record.isbn = isbn.map(str::to_string);
    record
}
