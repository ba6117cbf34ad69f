//! Storage for imported books.
//!
//! [`BookStore`] is the only thing the record consumer needs from
//! persistence: an ISBN existence check and a validating `create`.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryBookStore;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Book, NewBook, ValidationError};

/// Errors raised by a book store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence boundary for books
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Whether a book with this ISBN is stored
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError>;

    /// Validate and store a book
    async fn create(&self, book: NewBook) -> Result<Book, StoreError>;

    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError>;

    /// All books in insertion order
    async fn list(&self) -> Result<Vec<Book>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

/// Book rows plus id allocation, shared by the store implementations
#[derive(Debug, Default)]
pub(crate) struct Shelf {
    books: Vec<Book>,
    next_id: u64,
}

impl Shelf {
    pub(crate) fn from_books(books: Vec<Book>) -> Self {
        let next_id = books.iter().map(|b| b.id).max().unwrap_or(0) + 1;
        Self { books, next_id }
    }

    pub(crate) fn find(&self, isbn: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.isbn() == Some(isbn))
    }

    pub(crate) fn insert(&mut self, book: NewBook) -> Result<Book, StoreError> {
        book.validate()?;
        if let Some(isbn) = book.isbn.as_deref() {
            if self.find(isbn).is_some() {
                return Err(StoreError::DuplicateIsbn(isbn.to_string()));
            }
        }

        let stored = Book {
            id: self.next_id.max(1),
            fields: book,
            created_at: Utc::now(),
        };
        self.next_id = stored.id + 1;
        self.books.push(stored.clone());
        Ok(stored)
    }

    pub(crate) fn books(&self) -> &[Book] {
        &self.books
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookBuilder;

    fn draft(title: &str, isbn: &str) -> NewBook {
        BookBuilder::new()
            .title(title)
            .author("Someone")
            .isbn(isbn)
            .build()
            .unwrap()
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut shelf = Shelf::default();
        assert_eq!(shelf.insert(draft("A", "0451524934")).unwrap().id, 1);
        assert_eq!(shelf.insert(draft("B", "9780441172719")).unwrap().id, 2);
    }

    #[test]
    fn test_duplicate_isbn_rejected() {
        let mut shelf = Shelf::default();
        shelf.insert(draft("A", "0451524934")).unwrap();
        assert!(matches!(
            shelf.insert(draft("A again", "0451524934")),
            Err(StoreError::DuplicateIsbn(_))
        ));
    }

    #[test]
    fn test_invalid_book_rejected() {
        let mut shelf = Shelf::default();
        let mut book = draft("A", "0451524934");
        book.title.clear();
        assert!(matches!(
            shelf.insert(book),
            Err(StoreError::Validation(ValidationError::MissingTitle))
        ));
    }

    #[test]
    fn test_reloaded_shelf_continues_ids() {
        let mut shelf = Shelf::default();
        shelf.insert(draft("A", "0451524934")).unwrap();
        let mut reloaded = Shelf::from_books(shelf.books().to_vec());
        assert_eq!(reloaded.insert(draft("B", "9780441172719")).unwrap().id, 2);
    }
}
