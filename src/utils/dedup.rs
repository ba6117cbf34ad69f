//! ISBN-based deduplication for records merged across sources.

use std::collections::HashSet;

use crate::models::BookRecord;

/// Incremental filter over a stream of records
///
/// The set of seen ISBNs only grows. Records without a usable ISBN are
/// always admitted since there is nothing to compare them on.
#[derive(Debug, Default, Clone)]
pub struct IsbnDeduper {
    seen: HashSet<String>,
}

impl IsbnDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record should be kept, remembering its ISBN
    pub fn admit(&mut self, record: &BookRecord) -> bool {
        match record.dedup_key() {
            Some(isbn) => self.seen.insert(isbn.to_string()),
            None => true,
        }
    }

    /// Whether an ISBN has already been admitted
    pub fn has_seen(&self, isbn: &str) -> bool {
        self.seen.contains(isbn)
    }

    /// Number of distinct ISBNs admitted so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Remove later records whose ISBN already appeared, keeping order
pub fn dedupe_by_isbn(records: Vec<BookRecord>) -> Vec<BookRecord> {
    let mut deduper = IsbnDeduper::new();
    records
        .into_iter()
        .filter(|record| deduper.admit(record))
        .collect()
}
