//! Utility modules supporting catalog operations.
//!
//! - [`HttpClient`]: shared HTTP client with timeouts and retry
//! - [`with_retry`] / [`RetryConfig`]: exponential backoff for transient errors
//! - [`clean_isbn`] / [`preferred_isbn`]: ISBN normalization
//! - [`IsbnDeduper`] / [`dedupe_by_isbn`]: ISBN-based deduplication
//! - [`SearchCache`]: TTL cache used by the caching source decorator
//! - [`records_table`] / [`books_table`]: terminal tables for the CLI
//!
//! # Deduplication
//!
//! ```rust
//! use bookfinder::models::BookRecordBuilder;
//! use bookfinder::utils::dedupe_by_isbn;
//!
//! let records = vec![
//!     BookRecordBuilder::new("1984", "google_books").isbn("9780451524935").build(),
//!     BookRecordBuilder::new("1984", "open_library").isbn("9780451524935").build(),
//! ];
//! assert_eq!(dedupe_by_isbn(records).len(), 1);
//! ```

mod cache;
mod dedup;
mod display;
mod http;
mod isbn;
mod retry;

pub use cache::{CacheResult, CachedValue, SearchCache};
pub use dedup::{dedupe_by_isbn, IsbnDeduper};
pub use display::{books_table, records_table, truncate_with_ellipsis};
pub use http::HttpClient;
pub use isbn::{clean_isbn, preferred_isbn};
pub use retry::{is_transient, with_retry, RetryConfig};
