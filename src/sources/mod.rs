//! Catalog source adapters with a trait-based architecture.
//!
//! This module defines the [`BookSource`] trait that every catalog API adapter
//! implements. Adapters turn the API's own response shape into
//! [`BookRecord`]s and isolate their faults: a failing network call, a bad
//! status, or an unparsable body is logged at the adapter boundary and turned
//! into "not found" or an empty page, so one broken source never aborts a
//! multi-source search.
//!
//! # Implementing a New Source
//!
//! 1. Create a struct that implements `BookSource`
//! 2. Implement `id`, `name`, `normalize` and `try_search_page`
//! 3. Implement `try_search_by_isbn` / `try_fetch_by_id` if the API supports them
//! 4. Add a [`SourceKind`] variant so configuration can select it

mod cached;
mod google_books;
pub mod mock;
mod open_library;
mod registry;

pub use cached::CachedSource;
pub use google_books::GoogleBooksSource;
pub use mock::MockSource;
pub use open_library::OpenLibrarySource;
pub use registry::{SourceCapabilities, SourceRegistry};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::models::BookRecord;

/// The BookSource trait defines the interface for all catalog adapters.
///
/// Implementors provide the fallible `try_*` primitives. Callers use the
/// provided `search_*` / `fetch_by_id` methods, which never fail.
#[async_trait]
pub trait BookSource: Send + Sync + std::fmt::Debug {
    /// Unique identifier, also used as the record source tag
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::QUERY
    }

    /// Convert one raw API document into a record
    ///
    /// Missing fields never fail: absent identifiers give no ISBN and
    /// absent author lists give an empty list.
    fn normalize(&self, raw: &Value) -> Result<BookRecord, SourceError>;

    /// Fetch one page of query results starting at `offset`
    async fn try_search_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<BookRecord>, SourceError>;

    /// Look up a single book by ISBN
    async fn try_search_by_isbn(&self, _isbn: &str) -> Result<Option<BookRecord>, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Look up a single book by the source's own identifier
    async fn try_fetch_by_id(&self, _id: &str) -> Result<Option<BookRecord>, SourceError> {
        Err(SourceError::NotImplemented)
    }

    // ========== FAULT-ISOLATED LOOKUPS ==========

    /// Query results from the first page
    async fn search_by_query(&self, query: &str, limit: usize) -> Vec<BookRecord> {
        self.search_page(query, 0, limit).await
    }

    /// Query results starting at `offset`; empty on any failure
    async fn search_page(&self, query: &str, offset: usize, limit: usize) -> Vec<BookRecord> {
        match self.try_search_page(query, offset, limit).await {
            Ok(records) => records,
            Err(err) => {
                log_fault(self.id(), "query", query, &err);
                Vec::new()
            }
        }
    }

    /// ISBN lookup; `None` when not found or on any failure
    async fn search_by_isbn(&self, isbn: &str) -> Option<BookRecord> {
        match self.try_search_by_isbn(isbn).await {
            Ok(record) => record,
            Err(err) => {
                log_fault(self.id(), "isbn", isbn, &err);
                None
            }
        }
    }

    /// By-ID lookup; `None` when not found or on any failure
    async fn fetch_by_id(&self, id: &str) -> Option<BookRecord> {
        match self.try_fetch_by_id(id).await {
            Ok(record) => record,
            Err(err) => {
                log_fault(self.id(), "id", id, &err);
                None
            }
        }
    }
}

fn log_fault(source: &str, operation: &str, input: &str, err: &SourceError) {
    match err {
        SourceError::NotImplemented => {
            tracing::debug!(source, operation, "lookup not supported by source")
        }
        _ => tracing::warn!(source, operation, input, error = %err, "source lookup failed"),
    }
}

/// Normalize every document of a result list, skipping the ones that fail
pub(crate) fn normalize_all<'a>(
    source: &dyn BookSource,
    docs: impl IntoIterator<Item = &'a Value>,
) -> Vec<BookRecord> {
    docs.into_iter()
        .filter_map(|doc| match source.normalize(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(source = source.id(), error = %err, "skipping unreadable document");
                None
            }
        })
        .collect()
}

/// Read an explicit JSON `null` as the field's default value
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    let value = <Option<T> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// The closed set of catalog APIs this crate can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    GoogleBooks,
    OpenLibrary,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::GoogleBooks, SourceKind::OpenLibrary];

    /// Source id (also the record tag)
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::GoogleBooks => "google_books",
            SourceKind::OpenLibrary => "open_library",
        }
    }

    /// Build the adapter for this kind from configuration
    pub fn build(&self, config: &Config) -> Result<Arc<dyn BookSource>, SourceError> {
        Ok(match self {
            SourceKind::GoogleBooks => Arc::new(GoogleBooksSource::from_config(config)?),
            SourceKind::OpenLibrary => Arc::new(OpenLibrarySource::from_config(config)?),
        })
    }
}

impl std::str::FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s.trim())
            .ok_or_else(|| {
                SourceError::InvalidRequest(format!(
                    "unknown source '{}', expected one of: google_books, open_library",
                    s
                ))
            })
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Errors raised inside a source adapter
///
/// These never escape the fault-isolated lookup methods; they exist so the
/// adapter can log what went wrong and so retries can tell transient faults
/// from permanent ones.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded the request timeout
    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("HTTP status {0}")]
    Http(u16),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
