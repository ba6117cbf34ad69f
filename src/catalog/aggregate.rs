//! Multi-source aggregation with ISBN deduplication.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{CatalogError, ResultCursor};
use crate::models::BookRecord;
use crate::sources::BookSource;
use crate::utils::IsbnDeduper;

/// What one source contributed to an aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    /// Records the source returned (after the per-source limit)
    pub fetched: usize,
    /// Records that survived deduplication
    pub kept: usize,
}

/// Records of one source, in merged order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceGroup {
    pub source: String,
    pub records: Vec<BookRecord>,
}

/// State of one multi-source search
///
/// Owns the seen-ISBN set and the merged output; nothing outlives the
/// session.
#[derive(Debug)]
pub struct AggregationSession {
    sources: Vec<Arc<dyn BookSource>>,
    deduper: Option<IsbnDeduper>,
    records: Vec<BookRecord>,
    outcomes: Vec<SourceOutcome>,
}

impl AggregationSession {
    /// Create a session over `sources`, visited in the given order
    pub fn new(sources: Vec<Arc<dyn BookSource>>, dedupe: bool) -> Result<Self, CatalogError> {
        if sources.is_empty() {
            return Err(CatalogError::NoSources);
        }

        Ok(Self {
            sources,
            deduper: dedupe.then(IsbnDeduper::new),
            records: Vec::new(),
            outcomes: Vec::new(),
        })
    }

    /// Query every source in turn and merge the results source-major
    ///
    /// The token is checked before each source; once it fires, the records
    /// merged so far are returned.
    pub async fn run(
        mut self,
        query: &str,
        limit_per_source: usize,
        cancel: &CancellationToken,
    ) -> AggregatedResults {
        let sources = std::mem::take(&mut self.sources);
        let mut cancelled = false;

        for source in &sources {
            if cancel.is_cancelled() {
                tracing::info!(query, "aggregation cancelled");
                cancelled = true;
                break;
            }

            let mut batch = source.search_by_query(query, limit_per_source).await;
            batch.truncate(limit_per_source);
            self.merge(source.id(), batch);
        }

        AggregatedResults {
            query: query.to_string(),
            records: self.records,
            outcomes: self.outcomes,
            cancelled,
        }
    }

    fn merge(&mut self, source_id: &str, batch: Vec<BookRecord>) {
        let fetched = batch.len();
        let before = self.records.len();

        for record in batch {
            let record = record.tagged(source_id);
            let admitted = match self.deduper.as_mut() {
                Some(deduper) => deduper.admit(&record),
                None => true,
            };
            if admitted {
                self.records.push(record);
            }
        }

        let kept = self.records.len() - before;
        tracing::debug!(source = source_id, fetched, kept, "source merged");
        self.outcomes.push(SourceOutcome {
            source: source_id.to_string(),
            fetched,
            kept,
        });
    }
}

/// Search `sources` in order and merge their results
///
/// With `dedupe`, a record whose ISBN was already seen (from any earlier
/// source in this call) is dropped; records without an ISBN are always kept.
pub async fn aggregate(
    sources: &[Arc<dyn BookSource>],
    query: &str,
    limit_per_source: usize,
    dedupe: bool,
) -> Result<AggregatedResults, CatalogError> {
    aggregate_with_cancel(sources, query, limit_per_source, dedupe, &CancellationToken::new()).await
}

/// [`aggregate`] with a caller-held cancellation token
pub async fn aggregate_with_cancel(
    sources: &[Arc<dyn BookSource>],
    query: &str,
    limit_per_source: usize,
    dedupe: bool,
    cancel: &CancellationToken,
) -> Result<AggregatedResults, CatalogError> {
    let session = AggregationSession::new(sources.to_vec(), dedupe)?;
    Ok(session.run(query, limit_per_source, cancel).await)
}

/// Merged output of an aggregation
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedResults {
    query: String,
    records: Vec<BookRecord>,
    outcomes: Vec<SourceOutcome>,
    cancelled: bool,
}

impl AggregatedResults {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BookRecord> {
        self.records.iter()
    }

    /// Per-source counts, in visiting order
    pub fn outcomes(&self) -> &[SourceOutcome] {
        &self.outcomes
    }

    /// Whether the run stopped early on cancellation
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Partition the merged records by source tag, in first-appearance order
    pub fn group_by_source(&self) -> Vec<SourceGroup> {
        let mut groups: Vec<SourceGroup> = Vec::new();
        for record in &self.records {
            match groups.iter_mut().find(|g| g.source == record.source) {
                Some(group) => group.records.push(record.clone()),
                None => groups.push(SourceGroup {
                    source: record.source.clone(),
                    records: vec![record.clone()],
                }),
            }
        }
        groups
    }

    pub fn into_cursor(self) -> ResultCursor {
        ResultCursor::new(self.records, "multi_source")
    }

    pub fn into_records(self) -> Vec<BookRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a AggregatedResults {
    type Item = &'a BookRecord;
    type IntoIter = std::slice::Iter<'a, BookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::{make_record, MockSource};

    fn mock(id: &str, isbns: &[Option<&str>]) -> Arc<dyn BookSource> {
        Arc::new(MockSource::new(id).with_records(
            isbns
                .iter()
                .enumerate()
                .map(|(i, isbn)| make_record(&format!("{} {}", id, i), *isbn, id)),
        ))
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_source() {
        let sources = vec![
            mock("a", &[Some("111"), Some("222")]),
            mock("b", &[Some("222"), Some("333")]),
        ];

        let results = aggregate(&sources, "q", 10, true).await.unwrap();
        let isbns: Vec<_> = results.iter().filter_map(|r| r.isbn.as_deref()).collect();
        let tags: Vec<_> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(isbns, vec!["111", "222", "333"]);
        assert_eq!(tags, vec!["a", "a", "b"]);
        assert_eq!(results.outcomes()[1], SourceOutcome { source: "b".into(), fetched: 2, kept: 1 });
    }

    #[tokio::test]
    async fn test_records_without_isbn_are_kept() {
        let sources = vec![mock("a", &[None, None]), mock("b", &[None])];
        let results = aggregate(&sources, "q", 10, true).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_no_dedup_keeps_everything() {
        let sources = vec![mock("a", &[Some("111")]), mock("b", &[Some("111")])];
        let results = aggregate(&sources, "q", 10, false).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_limit_per_source() {
        let sources = vec![mock("a", &[None, None, None]), mock("b", &[None, None])];
        let results = aggregate(&sources, "q", 1, true).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_group_by_source() {
        let sources = vec![mock("b", &[None, None]), mock("a", &[None])];
        let groups = aggregate(&sources, "q", 10, true).await.unwrap().group_by_source();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].source, "b");
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[1].source, "a");
    }

    #[tokio::test]
    async fn test_empty_source_list_is_an_error() {
        assert!(matches!(
            aggregate(&[], "q", 10, true).await,
            Err(CatalogError::NoSources)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let sources = vec![mock("a", &[None])];
        let results = aggregate_with_cancel(&sources, "q", 10, true, &token).await.unwrap();
        assert!(results.is_cancelled());
        assert!(results.is_empty());
    }
}
