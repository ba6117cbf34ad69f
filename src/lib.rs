//! # bookfinder
//!
//! Book search across several public catalog APIs, merged into one
//! normalized record shape.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Normalized search records and persisted book entities
//! - [`sources`]: Catalog API adapters behind the [`BookSource`] trait
//! - [`catalog`]: Cursors, lazy paging, multi-source aggregation and import
//! - [`store`]: Persistence boundary used when importing records
//! - [`utils`]: HTTP client, retry, ISBN helpers, deduplication and caching
//! - [`config`]: Configuration management

pub mod catalog;
pub mod config;
pub mod models;
pub mod sources;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use catalog::{aggregate, AggregatedResults, BookCollection, LazyPager, RecordConsumer};
pub use models::{Book, BookRecord};
pub use sources::{BookSource, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
