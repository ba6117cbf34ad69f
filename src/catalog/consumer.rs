//! Turning search records into stored books.

use std::sync::Arc;

use super::BookCursor;
use crate::models::{Book, BookBuilder, BookRecord};
use crate::store::BookStore;
use crate::utils::clean_isbn;

/// Builds books from records and stores them
///
/// Bad records are logged and skipped; a single malformed record never
/// aborts a run. With `skip_existing`, records whose ISBN is already stored
/// are passed over; records without an ISBN are always stored.
#[derive(Debug)]
pub struct RecordConsumer<S: BookStore> {
    store: Arc<S>,
}

impl<S: BookStore> Clone for RecordConsumer<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

enum Outcome {
    Stored(Book),
    Skipped,
    Failed,
}

impl<S: BookStore> RecordConsumer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn materialize(&self, record: &BookRecord, skip_existing: bool) -> Outcome {
        if skip_existing {
            if let Some(isbn) = record.dedup_key().map(clean_isbn) {
                match self.store.exists_by_isbn(&isbn).await {
                    Ok(true) => {
                        tracing::debug!(isbn = %isbn, "already stored, skipping");
                        return Outcome::Skipped;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(isbn = %isbn, error = %e, "existence check failed");
                        return Outcome::Failed;
                    }
                }
            }
        }

        let draft = match BookBuilder::from_record(record).build() {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(title = %record.title, source = %record.source, error = %e, "skipping invalid record");
                return Outcome::Failed;
            }
        };

        match self.store.create(draft).await {
            Ok(book) => {
                tracing::info!(id = book.id, title = %book.title(), "book stored");
                Outcome::Stored(book)
            }
            Err(e) => {
                tracing::warn!(title = %record.title, error = %e, "could not store record");
                Outcome::Failed
            }
        }
    }

    /// Store every record of a list
    pub async fn materialize_all(&self, records: &[BookRecord], skip_existing: bool) -> Vec<Book> {
        let mut books = Vec::new();
        for record in records {
            if let Outcome::Stored(book) = self.materialize(record, skip_existing).await {
                books.push(book);
            }
        }
        books
    }

    /// Store everything a cursor has left
    pub async fn materialize_remaining<C>(&self, cursor: &mut C, skip_existing: bool) -> Vec<Book>
    where
        C: BookCursor + ?Sized,
    {
        let mut books = Vec::new();
        while let Some(record) = cursor.next_record().await {
            if let Outcome::Stored(book) = self.materialize(&record, skip_existing).await {
                books.push(book);
            }
        }
        books
    }

    /// Store the cursor's next record
    ///
    /// Never skips existing books. `None` at end of sequence or when the
    /// record could not be stored.
    pub async fn materialize_next<C>(&self, cursor: &mut C) -> Option<Book>
    where
        C: BookCursor + ?Sized,
    {
        let record = cursor.next_record().await?;
        match self.materialize(&record, false).await {
            Outcome::Stored(book) => Some(book),
            Outcome::Skipped | Outcome::Failed => None,
        }
    }

    /// Store up to `count` books, stopping early when the cursor runs out
    pub async fn materialize_batch<C>(
        &self,
        cursor: &mut C,
        count: usize,
        skip_existing: bool,
    ) -> Vec<Book>
    where
        C: BookCursor + ?Sized,
    {
        let mut books = Vec::new();
        while books.len() < count {
            let Some(record) = cursor.next_record().await else {
                break;
            };
            if let Outcome::Stored(book) = self.materialize(&record, skip_existing).await {
                books.push(book);
            }
        }
        books
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResultCursor;
    use crate::sources::mock::make_record;
    use crate::store::MemoryBookStore;

    fn consumer() -> RecordConsumer<MemoryBookStore> {
        RecordConsumer::new(Arc::new(MemoryBookStore::new()))
    }

    #[tokio::test]
    async fn test_skip_existing_is_idempotent() {
        let consumer = consumer();
        let record = make_record("Dune", Some("978-0441172719"), "mock");

        assert_eq!(consumer.materialize_all(&[record.clone()], true).await.len(), 1);
        assert!(consumer.materialize_all(&[record], true).await.is_empty());
        assert_eq!(consumer.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_records_without_isbn_always_stored() {
        let consumer = consumer();
        let record = make_record("Zine", None, "mock");

        consumer.materialize_all(&[record.clone()], true).await;
        consumer.materialize_all(&[record], true).await;
        assert_eq!(consumer.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_record_does_not_stop_batch() {
        let consumer = consumer();
        let records = vec![make_record("", None, "mock"), make_record("Emma", None, "mock")];

        let books = consumer.materialize_all(&records, true).await;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title(), "Emma");
        assert_eq!(books[0].author(), "Unknown Author");
        assert_eq!(books[0].source(), "mock");
    }

    #[tokio::test]
    async fn test_batch_stops_when_cursor_ends() {
        let consumer = consumer();
        let mut cursor = ResultCursor::new(
            vec![make_record("A", None, "mock"), make_record("B", None, "mock")],
            "mock",
        );

        assert_eq!(consumer.materialize_batch(&mut cursor, 5, true).await.len(), 2);
        assert!(consumer.materialize_next(&mut cursor).await.is_none());
    }

    #[tokio::test]
    async fn test_batch_counts_only_successes() {
        let consumer = consumer();
        let mut cursor = ResultCursor::new(
            vec![
                make_record("", None, "mock"),
                make_record("A", None, "mock"),
                make_record("B", None, "mock"),
                make_record("C", None, "mock"),
            ],
            "mock",
        );

        let books = consumer.materialize_batch(&mut cursor, 2, true).await;
        assert_eq!(books.len(), 2);
        assert_eq!(cursor.remaining().len(), 1);
    }
}
