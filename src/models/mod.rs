//! Core data models for search records and catalog entries.

mod book;
mod record;

pub use book::{Book, BookBuilder, NewBook, ValidationError, DEFAULT_LANGUAGE, UNKNOWN_AUTHOR};
pub use record::{BookRecord, BookRecordBuilder};
