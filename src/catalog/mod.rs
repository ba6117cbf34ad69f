//! Multi-source search over catalog sources.
//!
//! - [`ResultCursor`]: walks an already-fetched result list
//! - [`LazyPager`]: fetches one source page by page as records are consumed
//! - [`aggregate`]: merges several sources into one deduplicated, source-major list
//! - [`BookCollection`]: an ordered set of sources handing out the above
//! - [`RecordConsumer`]: turns records into stored books
//!
//! Per-source faults never surface here; the only hard error is asking for
//! a search over no sources at all.

mod aggregate;
mod collection;
mod consumer;
mod cursor;
mod pager;

pub use aggregate::{
    aggregate, aggregate_with_cancel, AggregatedResults, AggregationSession, SourceGroup,
    SourceOutcome,
};
pub use collection::BookCollection;
pub use consumer::RecordConsumer;
pub use cursor::ResultCursor;
pub use pager::{LazyPager, PagerState};

use async_trait::async_trait;

use crate::models::BookRecord;
use crate::store::StoreError;

/// Errors raised by catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A search was requested without any source
    #[error("No catalog sources configured")]
    NoSources,

    /// A source index outside the collection
    #[error("Source index {index} out of range ({len} sources)")]
    SourceIndex { index: usize, len: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A restartable sequence of records
#[async_trait]
pub trait BookCursor: Send {
    /// Next record, `None` at end of sequence
    async fn next_record(&mut self) -> Option<BookRecord>;

    /// Whether `next_record` would yield a record
    fn has_next(&self) -> bool;

    /// Restart from the first record
    async fn reset(&mut self);

    /// Records yielded since the last reset
    fn position(&self) -> usize;
}
