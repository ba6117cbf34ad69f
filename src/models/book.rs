//! Persisted book entity and the builder that validates it.

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::BookRecord;
use crate::utils::clean_isbn;

/// Language assigned when a record does not carry one
pub const DEFAULT_LANGUAGE: &str = "pt-BR";

/// Author assigned when a record lists no authors
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

const MAX_TITLE_LEN: usize = 255;
const MAX_AUTHOR_LEN: usize = 255;
const MAX_GENRE_LEN: usize = 100;
const MAX_PUBLISHER_LEN: usize = 255;
const MAX_LANGUAGE_LEN: usize = 10;
const MAX_SOURCE_LEN: usize = 50;
const MIN_PUBLICATION_YEAR: i32 = 1000;

/// Reasons a book cannot be created
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Title exceeds {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("Author is required")]
    MissingAuthor,

    #[error("Author exceeds {MAX_AUTHOR_LEN} characters")]
    AuthorTooLong,

    #[error("Genre exceeds {MAX_GENRE_LEN} characters")]
    GenreTooLong,

    #[error("Invalid ISBN: expected 10 or 13 characters, got {0}")]
    InvalidIsbn(usize),

    #[error("Publisher exceeds {MAX_PUBLISHER_LEN} characters")]
    PublisherTooLong,

    #[error("Invalid publication year: {0}")]
    InvalidYear(i32),

    #[error("Invalid cover URL: {0}")]
    InvalidCoverUrl(String),

    #[error("Page count must be positive")]
    InvalidPageCount,

    #[error("Language code exceeds {MAX_LANGUAGE_LEN} characters")]
    LanguageTooLong,

    #[error("Rating must be between 0.0 and 5.0, got {0}")]
    InvalidRating(f32),

    #[error("Invalid source tag: {0:?}")]
    InvalidSource(String),
}

/// Validated field set for a book that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: String,
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub description: String,
    pub cover_url: Option<String>,
    pub page_count: Option<u32>,
    pub language: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub average_rating: Option<f32>,
    pub source: String,
}

impl NewBook {
    /// Check every field constraint
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong);
        }

        let author = self.author.trim();
        if author.is_empty() {
            return Err(ValidationError::MissingAuthor);
        }
        if author.chars().count() > MAX_AUTHOR_LEN {
            return Err(ValidationError::AuthorTooLong);
        }

        if self.genre.chars().count() > MAX_GENRE_LEN {
            return Err(ValidationError::GenreTooLong);
        }

        if let Some(isbn) = &self.isbn {
            if isbn.len() != 10 && isbn.len() != 13 {
                return Err(ValidationError::InvalidIsbn(isbn.len()));
            }
        }

        if self.publisher.chars().count() > MAX_PUBLISHER_LEN {
            return Err(ValidationError::PublisherTooLong);
        }

        if let Some(year) = self.publication_year {
            if !(MIN_PUBLICATION_YEAR..=max_publication_year()).contains(&year) {
                return Err(ValidationError::InvalidYear(year));
            }
        }

        if let Some(cover) = &self.cover_url {
            let valid = url::Url::parse(cover)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(ValidationError::InvalidCoverUrl(cover.clone()));
            }
        }

        if self.page_count == Some(0) {
            return Err(ValidationError::InvalidPageCount);
        }

        if self.language.chars().count() > MAX_LANGUAGE_LEN {
            return Err(ValidationError::LanguageTooLong);
        }

        if let Some(rating) = self.average_rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(ValidationError::InvalidRating(rating));
            }
        }

        if self.source.len() > MAX_SOURCE_LEN || !source_tag_pattern().is_match(&self.source) {
            return Err(ValidationError::InvalidSource(self.source.clone()));
        }

        Ok(())
    }
}

fn max_publication_year() -> i32 {
    Utc::now().year() + 5
}

fn source_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_]+$").expect("static regex"))
}

/// A book stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier
    pub id: u64,

    #[serde(flatten)]
    pub fields: NewBook,

    /// When the book was stored
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn author(&self) -> &str {
        &self.fields.author
    }

    pub fn isbn(&self) -> Option<&str> {
        self.fields.isbn.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.fields.source
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.fields.title, self.fields.author)
    }
}

/// Builder for constructing validated NewBook objects
///
/// Setters only record values; all checks run in [`BookBuilder::build`].
#[derive(Debug, Clone)]
pub struct BookBuilder {
    book: NewBook,
}

impl Default for BookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BookBuilder {
    /// Create an empty builder tagged as a manual entry
    pub fn new() -> Self {
        Self {
            book: NewBook {
                title: String::new(),
                author: String::new(),
                genre: String::new(),
                isbn: None,
                publisher: String::new(),
                publication_year: None,
                description: String::new(),
                cover_url: None,
                page_count: None,
                language: DEFAULT_LANGUAGE.to_string(),
                categories: Vec::new(),
                average_rating: None,
                source: "manual".to_string(),
            },
        }
    }

    /// Apply the record-to-book recipe
    ///
    /// Lenient where the record is merely incomplete (no authors, an
    /// unparsable date, a zero rating); everything else is left for
    /// `build()` to reject.
    pub fn from_record(record: &BookRecord) -> Self {
        let mut builder = Self::new().title(&record.title);

        builder = if record.authors.is_empty() {
            builder.author(UNKNOWN_AUTHOR)
        } else {
            builder.author(record.authors.join(", "))
        };

        if let Some(isbn) = record.dedup_key() {
            builder = builder.isbn(isbn);
        }
        if let Some(publisher) = &record.publisher {
            builder = builder.publisher(publisher);
        }
        if let Some(year) = record.published_date.as_deref().and_then(parse_year) {
            builder = builder.publication_year(year);
        }
        if let Some(description) = &record.description {
            builder = builder.description(description);
        }
        if let Some(cover) = record.cover_url.as_deref().filter(|c| !c.is_empty()) {
            builder = builder.cover_url(cover);
        }
        if let Some(pages) = record.page_count.filter(|p| *p > 0) {
            builder = builder.page_count(pages);
        }
        if let Some(language) = record.language.as_deref().filter(|l| !l.is_empty()) {
            builder = builder.language(language);
        }
        if let Some(first) = record.categories.first() {
            builder = builder.genre(first.trim());
            for category in &record.categories {
                builder = builder.add_category(category);
            }
        }
        if let Some(rating) = record.average_rating.filter(|r| *r != 0.0) {
            builder = builder.average_rating(rating);
        }

        builder.source(&record.source)
    }

    pub fn title(mut self, title: impl AsRef<str>) -> Self {
        self.book.title = title.as_ref().trim().to_string();
        self
    }

    pub fn author(mut self, author: impl AsRef<str>) -> Self {
        self.book.author = author.as_ref().trim().to_string();
        self
    }

    pub fn genre(mut self, genre: impl AsRef<str>) -> Self {
        self.book.genre = genre.as_ref().trim().to_string();
        self
    }

    /// Set the ISBN; separators are stripped here
    pub fn isbn(mut self, isbn: impl AsRef<str>) -> Self {
        let cleaned = clean_isbn(isbn.as_ref());
        self.book.isbn = (!cleaned.is_empty()).then_some(cleaned);
        self
    }

    pub fn publisher(mut self, publisher: impl AsRef<str>) -> Self {
        self.book.publisher = publisher.as_ref().trim().to_string();
        self
    }

    pub fn publication_year(mut self, year: i32) -> Self {
        self.book.publication_year = Some(year);
        self
    }

    pub fn description(mut self, description: impl AsRef<str>) -> Self {
        self.book.description = description.as_ref().trim().to_string();
        self
    }

    pub fn cover_url(mut self, url: impl Into<String>) -> Self {
        self.book.cover_url = Some(url.into());
        self
    }

    pub fn page_count(mut self, pages: u32) -> Self {
        self.book.page_count = Some(pages);
        self
    }

    pub fn language(mut self, language: impl AsRef<str>) -> Self {
        let language = language.as_ref().trim();
        self.book.language = if language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language.to_string()
        };
        self
    }

    /// Append a category, ignoring blanks and repeats
    pub fn add_category(mut self, category: impl AsRef<str>) -> Self {
        let category = category.as_ref().trim();
        if !category.is_empty() && !self.book.categories.iter().any(|c| c == category) {
            self.book.categories.push(category.to_string());
        }
        self
    }

    /// Set the rating, rounded to two decimals
    pub fn average_rating(mut self, rating: f32) -> Self {
        self.book.average_rating = Some((rating * 100.0).round() / 100.0);
        self
    }

    pub fn source(mut self, source: impl AsRef<str>) -> Self {
        let source = source.as_ref().trim();
        self.book.source = if source.is_empty() {
            "manual".to_string()
        } else {
            source.to_string()
        };
        self
    }

    /// Validate and return the finished field set
    pub fn build(self) -> Result<NewBook, ValidationError> {
        self.book.validate()?;
        Ok(self.book)
    }
}

/// Leading four-digit year of a date string
fn parse_year(date: &str) -> Option<i32> {
    date.trim().get(..4)?.parse().ok()
}
