//! Google Books catalog source.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::models::{BookRecord, BookRecordBuilder};
use crate::sources::{normalize_all, null_as_default, BookSource, SourceCapabilities, SourceError};
use crate::utils::{preferred_isbn, HttpClient};

const GOOGLE_BOOKS_API_BASE: &str = "https://www.googleapis.com/books/v1/volumes";

/// Largest `maxResults` the volumes endpoint accepts
const MAX_RESULTS_CAP: usize = 40;

/// Google Books source
///
/// Uses the public volumes API. An API key is optional and only raises the
/// anonymous quota.
#[derive(Debug, Clone)]
pub struct GoogleBooksSource {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksSource {
    /// Create a source against the public endpoint with default HTTP settings
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpClient::new()?,
            base_url: GOOGLE_BOOKS_API_BASE.to_string(),
            api_key: None,
        })
    }

    /// Create a source from configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpClient::from_config(&config.http)?,
            base_url: config.endpoints.google_books.trim_end_matches('/').to_string(),
            api_key: config.api_keys.google_books.clone(),
        })
    }

    /// Point the source at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Replace the HTTP client
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    fn key_param(&self) -> String {
        match &self.api_key {
            Some(key) => format!("&key={}", urlencoding::encode(key)),
            None => String::new(),
        }
    }

    fn search_url(&self, query: &str, offset: usize, limit: usize) -> String {
        format!(
            "{}?q={}&maxResults={}&startIndex={}{}",
            self.base_url,
            urlencoding::encode(query),
            limit.min(MAX_RESULTS_CAP),
            offset,
            self.key_param()
        )
    }

    async fn fetch_volumes(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, SourceError> {
        let Some(body) = self.http.get_json(&self.search_url(query, offset, limit)).await? else {
            return Ok(Vec::new());
        };

        let page: VolumesPage = serde_json::from_value(body)?;
        Ok(page.items)
    }
}

#[async_trait]
impl BookSource for GoogleBooksSource {
    fn id(&self) -> &str {
        "google_books"
    }

    fn name(&self) -> &str {
        "Google Books"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::QUERY
            | SourceCapabilities::ISBN_LOOKUP
            | SourceCapabilities::ID_LOOKUP
            | SourceCapabilities::PAGINATION
    }

    fn normalize(&self, raw: &Value) -> Result<BookRecord, SourceError> {
        let volume: Volume = serde_json::from_value(raw.clone())?;
        let info = volume.volume_info;

        let isbn = preferred_isbn(
            info.identifiers_of("ISBN_13"),
            info.identifiers_of("ISBN_10"),
        );
        let cover_url = info.image_links.best();

        Ok(BookRecordBuilder::new(info.title, self.id())
            .authors(info.authors)
            .maybe_isbn(isbn)
            .publisher(info.publisher)
            .published_date(info.published_date)
            .description(info.description)
            .cover_url(cover_url)
            .page_count(info.page_count)
            .categories(info.categories)
            .language(info.language)
            .average_rating(info.average_rating)
            .build())
    }

    async fn try_search_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<BookRecord>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let items = self.fetch_volumes(query, offset, limit).await?;
        tracing::debug!(source = self.id(), query, offset, count = items.len(), "page fetched");
        Ok(normalize_all(self, &items))
    }

    async fn try_search_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, SourceError> {
        let items = self.fetch_volumes(&format!("isbn:{}", isbn), 0, 1).await?;
        items.first().map(|item| self.normalize(item)).transpose()
    }

    async fn try_fetch_by_id(&self, id: &str) -> Result<Option<BookRecord>, SourceError> {
        let mut url = format!("{}/{}", self.base_url, urlencoding::encode(id));
        if let Some(key) = &self.api_key {
            url = format!("{}?key={}", url, urlencoding::encode(key));
        }

        match self.http.get_json(&url).await? {
            Some(body) => self.normalize(&body).map(Some),
            None => Ok(None),
        }
    }
}

// ========== API RESPONSE SHAPES ==========

#[derive(Debug, Deserialize)]
struct VolumesPage {
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default, deserialize_with = "null_as_default")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    image_links: ImageLinks,
    language: Option<String>,
    average_rating: Option<f32>,
}

impl VolumeInfo {
    fn identifiers_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> {
        self.industry_identifiers
            .iter()
            .filter(move |id| id.kind == kind)
            .map(|id| id.identifier.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndustryIdentifier {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Largest available cover
    fn best(self) -> Option<String> {
        [
            self.extra_large,
            self.large,
            self.medium,
            self.small,
            self.thumbnail,
            self.small_thumbnail,
        ]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::RetryConfig;
    use serde_json::json;

    fn source_for(server: &mockito::ServerGuard) -> GoogleBooksSource {
        GoogleBooksSource::new()
            .unwrap()
            .with_base_url(format!("{}/books/v1/volumes", server.url()))
            .with_http_client(HttpClient::new().unwrap().with_retry_config(RetryConfig::no_retry()))
    }

    fn clean_code_volume() -> Value {
        json!({
            "id": "hjEFCAAAQBAJ",
            "volumeInfo": {
                "title": "Clean Code",
                "authors": ["Robert C. Martin"],
                "publisher": "Prentice Hall",
                "publishedDate": "2008-08-01",
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0132350882"},
                    {"type": "ISBN_13", "identifier": "978-0132350884"}
                ],
                "pageCount": 464,
                "categories": ["Computers"],
                "imageLinks": {
                    "smallThumbnail": "http://books.google.com/small",
                    "thumbnail": "http://books.google.com/thumb"
                },
                "language": "en",
                "averageRating": 4.5
            }
        })
    }

    #[test]
    fn test_normalize_full_volume() {
        let source = GoogleBooksSource::new().unwrap();
        let record = source.normalize(&clean_code_volume()).unwrap();

        assert_eq!(record.title, "Clean Code");
        assert_eq!(record.authors, vec!["Robert C. Martin"]);
        assert_eq!(record.isbn.as_deref(), Some("9780132350884"));
        assert_eq!(record.cover_url.as_deref(), Some("http://books.google.com/thumb"));
        assert_eq!(record.page_count, Some(464));
        assert_eq!(record.average_rating, Some(4.5));
        assert_eq!(record.source, "google_books");
    }

    #[test]
    fn test_normalize_sparse_volume() {
        let source = GoogleBooksSource::new().unwrap();
        let record = source
            .normalize(&json!({"volumeInfo": {"title": "Untitled Notes"}}))
            .unwrap();

        assert_eq!(record.title, "Untitled Notes");
        assert!(record.authors.is_empty());
        assert!(record.isbn.is_none());
        assert!(record.cover_url.is_none());
    }

    #[test]
    fn test_null_lists_read_as_empty() {
        let source = GoogleBooksSource::new().unwrap();
        let record = source
            .normalize(&json!({"volumeInfo": {
                "title": "X",
                "authors": null,
                "industryIdentifiers": null,
                "categories": null,
                "imageLinks": null
            }}))
            .unwrap();

        assert_eq!(record.title, "X");
        assert!(record.authors.is_empty());
        assert!(record.isbn.is_none());
        assert!(record.categories.is_empty());
        assert!(record.cover_url.is_none());
    }

    #[test]
    fn test_cover_prefers_largest_image() {
        let source = GoogleBooksSource::new().unwrap();
        let links = json!({
            "smallThumbnail": "http://img/smallThumbnail",
            "thumbnail": "http://img/thumbnail",
            "small": "http://img/small",
            "medium": "http://img/medium",
            "large": "http://img/large",
            "extraLarge": "http://img/extraLarge"
        });
        let cover = |links: &Value| {
            source
                .normalize(&json!({"volumeInfo": {"title": "Covers", "imageLinks": links}}))
                .unwrap()
                .cover_url
        };

        let mut links = links;
        for expected in ["extraLarge", "large", "medium", "small", "thumbnail", "smallThumbnail"] {
            assert_eq!(cover(&links), Some(format!("http://img/{}", expected)));
            links.as_object_mut().unwrap().remove(expected);
        }
        assert_eq!(cover(&links), None);
    }

    #[test]
    fn test_isbn_10_fallback() {
        let source = GoogleBooksSource::new().unwrap();
        let record = source
            .normalize(&json!({"volumeInfo": {
                "title": "Old Print",
                "industryIdentifiers": [{"type": "ISBN_10", "identifier": "0-451-52493-4"}]
            }}))
            .unwrap();
        assert_eq!(record.isbn.as_deref(), Some("0451524934"));
    }

    #[tokio::test]
    async fn test_search_page_uses_offset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/books/v1/volumes")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".into(), "clean code".into()),
                mockito::Matcher::UrlEncoded("startIndex".into(), "20".into()),
                mockito::Matcher::UrlEncoded("maxResults".into(), "10".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(json!({"totalItems": 1, "items": [clean_code_volume()]}).to_string())
            .create_async()
            .await;

        let records = source_for(&server).search_page("clean code", 20, 10).await;
        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Clean Code");
    }

    #[tokio::test]
    async fn test_server_error_gives_empty_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/books/v1/volumes")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let records = source_for(&server).search_by_query("dune", 5).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_isbn_lookup_without_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/books/v1/volumes")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "isbn:0000000000".into()))
            .with_body(r#"{"totalItems": 0}"#)
            .create_async()
            .await;

        assert!(source_for(&server).search_by_isbn("0000000000").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_by_id_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/books/v1/volumes/missing")
            .with_status(404)
            .create_async()
            .await;

        let result = source_for(&server).try_fetch_by_id("missing").await.unwrap();
        assert!(result.is_none());
    }
}
