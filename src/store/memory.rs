//! In-memory book store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookStore, Shelf, StoreError};
use crate::models::{Book, NewBook};

/// Volatile store, used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    shelf: RwLock<Shelf>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        Ok(self.shelf.read().await.find(isbn).is_some())
    }

    async fn create(&self, book: NewBook) -> Result<Book, StoreError> {
        self.shelf.write().await.insert(book)
    }

    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        Ok(self.shelf.read().await.find(isbn).cloned())
    }

    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.shelf.read().await.books().to_vec())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.shelf.read().await.books().len())
    }
}
