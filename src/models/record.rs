//! Normalized book record produced by every catalog source.

use serde::{Deserialize, Serialize};

/// A book as reported by one catalog source
///
/// Every source adapter converts its own response shape into this struct,
/// so everything downstream (cursors, aggregation, import) only ever sees
/// one format. Records are treated as values: adapters build them once and
/// later stages only move or clone them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Book title (may be empty when the source omitted it)
    #[serde(default)]
    pub title: String,

    /// Authors in the order the source listed them
    #[serde(default)]
    pub authors: Vec<String>,

    /// Cleaned ISBN-13 or ISBN-10, the natural deduplication key
    pub isbn: Option<String>,

    /// Publisher name
    pub publisher: Option<String>,

    /// Publication date as reported (`YYYY` or `YYYY-MM-DD`)
    pub published_date: Option<String>,

    /// Synopsis
    pub description: Option<String>,

    /// Best available cover image URL
    pub cover_url: Option<String>,

    /// Number of pages
    pub page_count: Option<u32>,

    /// Subjects or genres
    #[serde(default)]
    pub categories: Vec<String>,

    /// Language code
    pub language: Option<String>,

    /// Average reader rating (0.0 to 5.0)
    pub average_rating: Option<f32>,

    /// Id of the source that produced this record
    #[serde(default)]
    pub source: String,
}

impl BookRecord {
    /// Create a record with only a title and source tag
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            isbn: None,
            publisher: None,
            published_date: None,
            description: None,
            cover_url: None,
            page_count: None,
            categories: Vec::new(),
            language: None,
            average_rating: None,
            source: source.into(),
        }
    }

    /// Returns the ISBN when it is present and non-empty
    pub fn dedup_key(&self) -> Option<&str> {
        self.isbn.as_deref().filter(|isbn| !isbn.is_empty())
    }

    /// Returns the record re-tagged with the given source id
    pub fn tagged(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}

/// Builder for constructing BookRecord objects
#[derive(Debug, Clone)]
pub struct BookRecordBuilder {
    record: BookRecord,
}

impl BookRecordBuilder {
    /// Create a new builder with required fields
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            record: BookRecord::new(title, source),
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set ISBN
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.record.isbn = Some(isbn.into());
        self
    }

    /// Set ISBN from an optional value
    pub fn maybe_isbn(mut self, isbn: Option<String>) -> Self {
        self.record.isbn = isbn;
        self
    }

    /// Set publisher
    pub fn publisher(mut self, publisher: Option<String>) -> Self {
        self.record.publisher = publisher;
        self
    }

    /// Set publication date
    pub fn published_date(mut self, date: Option<String>) -> Self {
        self.record.published_date = date;
        self
    }

    /// Set description
    pub fn description(mut self, description: Option<String>) -> Self {
        self.record.description = description;
        self
    }

    /// Set cover URL
    pub fn cover_url(mut self, url: Option<String>) -> Self {
        self.record.cover_url = url;
        self
    }

    /// Set page count
    pub fn page_count(mut self, pages: Option<u32>) -> Self {
        self.record.page_count = pages;
        self
    }

    /// Set categories
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set language
    pub fn language(mut self, language: Option<String>) -> Self {
        self.record.language = language;
        self
    }

    /// Set average rating
    pub fn average_rating(mut self, rating: Option<f32>) -> Self {
        self.record.average_rating = rating;
        self
    }

    /// Build the BookRecord
    pub fn build(self) -> BookRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = BookRecordBuilder::new("Clean Code", "google_books")
            .authors(["Robert C. Martin"])
            .isbn("9780132350884")
            .page_count(Some(464))
            .average_rating(Some(4.5))
            .build();

        assert_eq!(record.title, "Clean Code");
        assert_eq!(record.authors, vec!["Robert C. Martin".to_string()]);
        assert_eq!(record.dedup_key(), Some("9780132350884"));
        assert_eq!(record.source, "google_books");
    }

    #[test]
    fn test_empty_isbn_is_not_a_key() {
        let record = BookRecordBuilder::new("Untitled", "mock").isbn("").build();
        assert_eq!(record.dedup_key(), None);
    }

    #[test]
    fn test_tagged_replaces_source() {
        let record = BookRecord::new("Dune", "open_library").tagged("cache");
        assert_eq!(record.source, "cache");
    }
}
