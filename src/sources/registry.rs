//! Registry for managing catalog source adapters.

use std::sync::Arc;

use super::{BookSource, CachedSource, SourceError, SourceKind};
use crate::config::Config;
use crate::utils::SearchCache;

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const QUERY = 1 << 0;
        const ISBN_LOOKUP = 1 << 1;
        const ID_LOOKUP = 1 << 2;
        const PAGINATION = 1 << 3;
    }
}

/// Ordered collection of catalog sources
///
/// Registration order is the order aggregated searches visit sources in,
/// which decides which duplicate survives.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn BookSource>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the configured sources, in configured order
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(SearchCache::from_config(&config.cache)));

        let mut registry = Self::new();
        for id in &config.search.sources {
            let source = id.parse::<SourceKind>()?.build(config)?;
            match &cache {
                Some(cache) => registry.register(Arc::new(CachedSource::new(source, cache.clone()))),
                None => registry.register(source),
            }
        }

        tracing::debug!(sources = ?registry.ids().collect::<Vec<_>>(), "source registry built");
        Ok(registry)
    }

    /// Register a new source, replacing any source with the same id in place
    pub fn register(&mut self, source: Arc<dyn BookSource>) {
        match self.sources.iter().position(|s| s.id() == source.id()) {
            Some(index) => self.sources[index] = source,
            None => self.sources.push(source),
        }
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn BookSource>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Get a source by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn BookSource>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::NotFound(format!("Source '{}' not found", id)))
    }

    /// Get all registered sources in order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn BookSource>> {
        self.sources.iter()
    }

    /// Get all source IDs in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    /// Get sources that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn BookSource>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Check if a source exists
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Copy of the ordered source list
    pub fn to_vec(&self) -> Vec<Arc<dyn BookSource>> {
        self.sources.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    #[test]
    fn test_registry_from_default_config() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["google_books", "open_library"]
        );
    }

    #[test]
    fn test_configured_order_is_kept() {
        let mut config = Config::default();
        config.search.sources = vec!["open_library".into(), "google_books".into()];
        config.cache.enabled = false;

        let registry = SourceRegistry::from_config(&config).unwrap();
        assert_eq!(registry.ids().next(), Some("open_library"));
    }

    #[test]
    fn test_get_source() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("a")));

        assert_eq!(registry.get("a").unwrap().id(), "a");
        assert!(registry.get("nonexistent").is_none());
        assert!(matches!(
            registry.get_required("nonexistent"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_reregistering_keeps_position() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("a")));
        registry.register(Arc::new(MockSource::new("b")));
        registry.register(Arc::new(MockSource::new("a").failing()));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_capabilities() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();

        let google = registry.get("google_books").unwrap();
        assert!(google.capabilities().contains(SourceCapabilities::ID_LOOKUP));

        let open_library = registry.get("open_library").unwrap();
        assert!(open_library.capabilities().contains(SourceCapabilities::ISBN_LOOKUP));
        assert!(!open_library.capabilities().contains(SourceCapabilities::ID_LOOKUP));

        assert_eq!(registry.with_capability(SourceCapabilities::PAGINATION).len(), 2);
    }
}
