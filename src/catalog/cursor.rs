//! Cursor over an in-memory result list.

use async_trait::async_trait;

use super::BookCursor;
use crate::models::BookRecord;

/// Walks a fixed list of records fetched in one go
#[derive(Debug, Clone, Default)]
pub struct ResultCursor {
    records: Vec<BookRecord>,
    source: String,
    position: usize,
}

impl ResultCursor {
    pub fn new(records: Vec<BookRecord>, source: impl Into<String>) -> Self {
        Self {
            records,
            source: source.into(),
            position: 0,
        }
    }

    /// Where the records came from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    /// Next record without advancing
    pub fn peek(&self) -> Option<&BookRecord> {
        self.records.get(self.position)
    }

    /// Advance past up to `count` records
    pub fn skip_records(&mut self, count: usize) {
        self.position = (self.position + count).min(self.records.len());
    }

    pub fn remaining(&self) -> &[BookRecord] {
        &self.records[self.position..]
    }
}

impl Iterator for ResultCursor {
    type Item = BookRecord;

    fn next(&mut self) -> Option<BookRecord> {
        let record = self.records.get(self.position)?.clone();
        self.position += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.records.len() - self.position;
        (left, Some(left))
    }
}

#[async_trait]
impl BookCursor for ResultCursor {
    async fn next_record(&mut self) -> Option<BookRecord> {
        self.next()
    }

    fn has_next(&self) -> bool {
        self.position < self.records.len()
    }

    async fn reset(&mut self) {
        self.position = 0;
    }

    fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> ResultCursor {
        ResultCursor::new(
            ["Dune", "Emma", "Ulysses"]
                .into_iter()
                .map(|t| BookRecord::new(t, "mock"))
                .collect(),
            "mock",
        )
    }

    #[tokio::test]
    async fn test_walk_and_reset() {
        let mut cursor = cursor();
        assert_eq!(cursor.total_count(), 3);

        let titles: Vec<_> = cursor.by_ref().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Dune", "Emma", "Ulysses"]);
        assert!(!cursor.has_next());
        assert!(cursor.next_record().await.is_none());

        cursor.reset().await;
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.peek().map(|r| r.title.as_str()), Some("Dune"));
    }

    #[test]
    fn test_skip_is_clamped() {
        let mut cursor = cursor();
        cursor.skip_records(2);
        assert_eq!(cursor.peek().unwrap().title, "Ulysses");
        cursor.skip_records(10);
        assert_eq!(cursor.position(), 3);
        assert!(cursor.peek().is_none());
        assert!(cursor.remaining().is_empty());
    }
}
