//! Book store backed by a JSON file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{BookStore, Shelf, StoreError};
use crate::models::{Book, NewBook};

/// Keeps every book in memory and rewrites the file after each create
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    shelf: RwLock<Shelf>,
}

impl JsonFileStore {
    /// Open a store, loading the file if it exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let books: Vec<Book> = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), books = books.len(), "book store opened");

        Ok(Self {
            path,
            shelf: RwLock::new(Shelf::from_books(books)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, books: &[Book]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(books)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl BookStore for JsonFileStore {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        Ok(self.shelf.read().await.find(isbn).is_some())
    }

    async fn create(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut shelf = self.shelf.write().await;
        let stored = shelf.insert(book)?;

        if let Err(e) = self.persist(shelf.books()).await {
            // keep memory and file in step
            *shelf = Shelf::from_books(
                shelf
                    .books()
                    .iter()
                    .filter(|b| b.id != stored.id)
                    .cloned()
                    .collect(),
            );
            return Err(e);
        }

        Ok(stored)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookBuilder;

    fn draft(title: &str, isbn: &str) -> NewBook {
        BookBuilder::new()
            .title(title)
            .author("Machado de Assis")
            .isbn(isbn)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_books_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.create(draft("Dom Casmurro", "8508040377")).await.unwrap();
        store.create(draft("O Alienista", "9788508040377")).await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert!(reopened.exists_by_isbn("8508040377").await.unwrap());

        let stored = reopened.create(draft("Helena", "8572326971")).await.unwrap();
        assert_eq!(stored.id, 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("none.json")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get_by_isbn("8508040377").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Serialization(_))
        ));
    }
}
