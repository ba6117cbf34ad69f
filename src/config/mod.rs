//! Configuration management.
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML
//! file, and `BOOKFINDER__SECTION__KEY` environment variables.
//!
//! ```toml
//! [api_keys]
//! google_books = "your-api-key"
//!
//! [http]
//! timeout_secs = 10
//! retry_attempts = 2
//!
//! [search]
//! sources = ["google_books", "open_library"]
//! limit_per_source = 10
//! page_size = 10
//! max_pages = 5
//! deduplicate = true
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 300
//!
//! [store]
//! path = "./library.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sources::SourceKind;

/// Errors raised while loading or checking configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for catalog services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Lookup cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Local catalog file
    #[serde(default)]
    pub store: StoreConfig,

    /// Base URLs of the catalog APIs
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

impl Config {
    /// Reject settings that would make searches meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        if self.search.limit_per_source == 0 {
            return Err(ConfigError::Invalid(
                "search.limit_per_source must be positive".into(),
            ));
        }
        if self.search.page_size == 0 || self.search.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "search.page_size and search.max_pages must be positive".into(),
            ));
        }
        for id in &self.search.sources {
            id.parse::<SourceKind>()
                .map_err(|_| ConfigError::Invalid(format!("unknown source '{}'", id)))?;
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Google Books API key (optional, raises the anonymous quota)
    #[serde(default = "google_books_key_from_env")]
    pub google_books: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            google_books: google_books_key_from_env(),
        }
    }
}

fn google_books_key_from_env() -> Option<String> {
    std::env::var("GOOGLE_BOOKS_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Attempts per request for transient failures
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// First retry delay in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: None,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    500
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Sources to query, in order
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Results requested from each source
    #[serde(default = "default_limit")]
    pub limit_per_source: usize,

    /// Page size for lazy browsing
    #[serde(default = "default_limit")]
    pub page_size: usize,

    /// Maximum pages fetched by lazy browsing
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Drop records whose ISBN was already returned by an earlier source
    #[serde(default = "default_true")]
    pub deduplicate: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            limit_per_source: default_limit(),
            page_size: default_limit(),
            max_pages: default_max_pages(),
            deduplicate: true,
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["google_books".to_string(), "open_library".to_string()]
}

fn default_limit() -> usize {
    10
}

fn default_max_pages() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Lookup cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,

    /// Entry count that triggers pruning
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_max_entries() -> usize {
    1024
}

/// Local catalog storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding imported books
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Default location of the imported-books file
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("bookfinder").join("library.json"))
        .unwrap_or_else(|| PathBuf::from("./library.json"))
}

/// Base URLs for the catalog APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_google_books_url")]
    pub google_books: String,

    #[serde(default = "default_open_library_url")]
    pub open_library: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            google_books: default_google_books_url(),
            open_library: default_open_library_url(),
        }
    }
}

fn default_google_books_url() -> String {
    "https://www.googleapis.com/books/v1/volumes".to_string()
}

fn default_open_library_url() -> String {
    "https://openlibrary.org".to_string()
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("BOOKFINDER")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("search.sources")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Find a configuration file in the usual places
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("bookfinder.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bookfinder").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.search.sources, vec!["google_books", "open_library"]);
        assert!(config.search.deduplicate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_source_rejected() {
        let mut config = Config::default();
        config.search.sources.push("goodreads".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = Config::default();
        config.search.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[search]\nsources = [\"open_library\"]\nlimit_per_source = 3\n\n[cache]\nenabled = false"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.search.sources, vec!["open_library"]);
        assert_eq!(config.search.limit_per_source, 3);
        assert_eq!(config.search.page_size, 10);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[search]"));
        assert!(rendered.contains("open_library"));
    }
}
