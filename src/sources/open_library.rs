//! Open Library catalog source.
//!
//! Open Library answers queries with "search documents" and ISBN lookups
//! with "editions"; the two shapes name the same facts differently, so
//! normalization reads whichever field is present.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::models::{BookRecord, BookRecordBuilder};
use crate::sources::{normalize_all, null_as_default, BookSource, SourceCapabilities, SourceError};
use crate::utils::{clean_isbn, preferred_isbn, HttpClient};

const OPEN_LIBRARY_API_BASE: &str = "https://openlibrary.org";
const COVERS_BASE: &str = "https://covers.openlibrary.org/b/id";
const MAX_SUBJECTS: usize = 5;

/// Open Library source
#[derive(Debug, Clone)]
pub struct OpenLibrarySource {
    http: HttpClient,
    base_url: String,
}

impl OpenLibrarySource {
    /// Create a source against the public endpoint with default HTTP settings
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpClient::new()?,
            base_url: OPEN_LIBRARY_API_BASE.to_string(),
        })
    }

    /// Create a source from configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpClient::from_config(&config.http)?,
            base_url: config.endpoints.open_library.trim_end_matches('/').to_string(),
        })
    }

    /// Point the source at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }
}

/// Map Open Library's three-letter language codes
fn map_language(code: &str) -> String {
    let code = code.trim_start_matches("/languages/");
    match code {
        "eng" => "en",
        "por" => "pt-BR",
        "spa" => "es",
        "fre" => "fr",
        "ger" => "de",
        other => other,
    }
    .to_string()
}

#[async_trait]
impl BookSource for OpenLibrarySource {
    fn id(&self) -> &str {
        "open_library"
    }

    fn name(&self) -> &str {
        "Open Library"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::QUERY | SourceCapabilities::ISBN_LOOKUP | SourceCapabilities::PAGINATION
    }

    fn normalize(&self, raw: &Value) -> Result<BookRecord, SourceError> {
        let doc: OlDocument = serde_json::from_value(raw.clone())?;

        let authors: Vec<String> = if doc.author_name.is_empty() {
            doc.authors.iter().filter_map(|a| a.name.clone()).collect()
        } else {
            doc.author_name.clone()
        };

        let isbn = preferred_isbn(
            doc.isbn_13.iter().map(String::as_str),
            doc.isbn_10.iter().map(String::as_str),
        )
        .or_else(|| doc.longest_isbn());

        let publisher = doc
            .publisher
            .first()
            .or_else(|| doc.publishers.first())
            .cloned();

        let published_date = doc
            .first_publish_year
            .map(|year| year.to_string())
            .or_else(|| doc.publish_date_text());

        let cover_url = doc
            .cover_i
            .filter(|id| *id > 0)
            .or_else(|| doc.covers.iter().copied().find(|id| *id > 0))
            .map(|id| format!("{}/{}-L.jpg", COVERS_BASE, id));

        let language = doc
            .language
            .first()
            .cloned()
            .or_else(|| doc.languages.first().map(|l| l.key.clone()))
            .map(|code| map_language(&code));

        Ok(BookRecordBuilder::new(doc.title.clone(), self.id())
            .authors(authors)
            .maybe_isbn(isbn)
            .publisher(publisher)
            .published_date(published_date)
            .cover_url(cover_url)
            .page_count(doc.number_of_pages.or(doc.number_of_pages_median))
            .categories(doc.subject.iter().take(MAX_SUBJECTS).cloned())
            .language(language)
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

        let url = format!(
            "{}/search.json?q={}&limit={}&offset={}",
            self.base_url,
            urlencoding::encode(query),
            limit,
            offset
        );

        let Some(body) = self.http.get_json(&url).await? else {
            return Ok(Vec::new());
        };
        let page: SearchPage = serde_json::from_value(body)?;
        tracing::debug!(source = self.id(), query, offset, count = page.docs.len(), "page fetched");

        Ok(normalize_all(self, &page.docs))
    }

    async fn try_search_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, SourceError> {
        let url = format!("{}/isbn/{}.json", self.base_url, urlencoding::encode(isbn));

        match self.http.get_json(&url).await? {
            Some(body) => self.normalize(&body).map(Some),
            None => Ok(None),
        }
    }
}

// ========== API RESPONSE SHAPES ==========

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default, deserialize_with = "null_as_default")]
    docs: Vec<Value>,
}

/// Union of the search-document and edition fields we read
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OlDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    author_name: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    authors: Vec<OlAuthor>,
    #[serde(default, deserialize_with = "null_as_default")]
    isbn: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    isbn_13: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    isbn_10: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    publisher: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    publishers: Vec<String>,
    first_publish_year: Option<i32>,
    publish_date: Option<Value>,
    cover_i: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    covers: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    subject: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    language: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    languages: Vec<OlKey>,
    number_of_pages: Option<u32>,
    number_of_pages_median: Option<u32>,
}

impl OlDocument {
    /// First longest entry of the `isbn` list, cleaned
    fn longest_isbn(&self) -> Option<String> {
        self.isbn
            .iter()
            .map(|raw| clean_isbn(raw))
            .filter(|isbn| !isbn.is_empty())
            .fold(None, |best: Option<String>, isbn| match best {
                Some(b) if b.len() >= isbn.len() => Some(b),
                _ => Some(isbn),
            })
    }

    /// Editions carry a string; search documents carry a list
    fn publish_date_text(&self) -> Option<String> {
        match self.publish_date.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OlAuthor {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OlKey {
    key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::RetryConfig;
    use serde_json::json;

    fn source_for(server: &mockito::ServerGuard) -> OpenLibrarySource {
        OpenLibrarySource::new()
            .unwrap()
            .with_base_url(server.url())
            .with_http_client(HttpClient::new().unwrap().with_retry_config(RetryConfig::no_retry()))
    }

    #[test]
    fn test_normalize_search_document() {
        let source = OpenLibrarySource::new().unwrap();
        let record = source
            .normalize(&json!({
                "title": "Nineteen Eighty-Four",
                "author_name": ["George Orwell"],
                "isbn": ["0451524934", "978-0451524935"],
                "publisher": ["Signet Classic", "Penguin"],
                "first_publish_year": 1949,
                "cover_i": 153541,
                "subject": ["Dystopia", "Fiction", "Politics", "London", "Telescreens", "Surveillance"],
                "language": ["eng"]
            }))
            .unwrap();

        assert_eq!(record.authors, vec!["George Orwell"]);
        assert_eq!(record.isbn.as_deref(), Some("9780451524935"));
        assert_eq!(record.publisher.as_deref(), Some("Signet Classic"));
        assert_eq!(record.published_date.as_deref(), Some("1949"));
        assert_eq!(
            record.cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/153541-L.jpg")
        );
        assert_eq!(record.categories.len(), 5);
        assert_eq!(record.language.as_deref(), Some("en"));
        assert!(record.description.is_none());
        assert!(record.average_rating.is_none());
    }

    #[test]
    fn test_normalize_edition() {
        let source = OpenLibrarySource::new().unwrap();
        let record = source
            .normalize(&json!({
                "title": "O Alienista",
                "authors": [{"key": "/authors/OL1A"}, {"name": "Machado de Assis"}],
                "isbn_10": ["8508040377"],
                "publishers": ["Ática"],
                "publish_date": "1998",
                "covers": [-1, 8231856],
                "languages": [{"key": "/languages/por"}],
                "number_of_pages": 80
            }))
            .unwrap();

        assert_eq!(record.authors, vec!["Machado de Assis"]);
        assert_eq!(record.isbn.as_deref(), Some("8508040377"));
        assert_eq!(record.publisher.as_deref(), Some("Ática"));
        assert_eq!(record.published_date.as_deref(), Some("1998"));
        assert_eq!(
            record.cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/8231856-L.jpg")
        );
        assert_eq!(record.language.as_deref(), Some("pt-BR"));
        assert_eq!(record.page_count, Some(80));
    }

    #[test]
    fn test_null_lists_read_as_empty() {
        let source = OpenLibrarySource::new().unwrap();
        let record = source
            .normalize(&json!({
                "title": "Dom Casmurro",
                "author_name": null,
                "authors": null,
                "isbn": null,
                "publisher": null,
                "subject": null,
                "language": null
            }))
            .unwrap();

        assert_eq!(record.title, "Dom Casmurro");
        assert!(record.authors.is_empty());
        assert!(record.isbn.is_none());
        assert!(record.publisher.is_none());
        assert!(record.categories.is_empty());
    }

    #[test]
    fn test_unknown_language_passes_through() {
        assert_eq!(map_language("jpn"), "jpn");
        assert_eq!(map_language("/languages/ger"), "de");
    }

    #[tokio::test]
    async fn test_search_page_uses_offset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".into(), "orwell".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "2".into()),
                mockito::Matcher::UrlEncoded("offset".into(), "4".into()),
            ]))
            .with_body(
                json!({"numFound": 2, "docs": [
                    {"title": "Animal Farm", "author_name": ["George Orwell"]},
                    {"title": "Burmese Days", "author_name": ["George Orwell"]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let records = source_for(&server).search_page("orwell", 4, 2).await;
        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source == "open_library"));
    }

    #[tokio::test]
    async fn test_isbn_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/isbn/0000000000.json")
            .with_status(404)
            .create_async()
            .await;

        assert!(source_for(&server).search_by_isbn("0000000000").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_is_isolated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search.json")
            .match_query(mockito::Matcher::Any)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        assert!(source_for(&server).search_by_query("dune", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_by_id_unsupported() {
        let source = OpenLibrarySource::new().unwrap();
        assert!(matches!(
            source.try_fetch_by_id("OL1M").await,
            Err(SourceError::NotImplemented)
        ));
        assert!(source.fetch_by_id("OL1M").await.is_none());
    }
}
