//! Shared in-memory collaborators for integration tests
//!
//! `MockIndex` implements the `IndexClient` trait over a vector of stored
//! passages: 1-dimensional dot-product similarity for `search`, filter
//! evaluation (including substring matches) for `scroll`. `SimpleVariants`
//! is a minimal query-variant generator: lower-cased term plus any
//! configured extra variants, whitespace tokenization.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use hybrid_retrieval::{
    Clause, Filter, IndexClient, IndexPoint, IndexQuery, Payload, PointId, QueryVariantGenerator,
    Result, ScrollPoint, ScrollRequest, ScrollResponse, SearchError,
};

/// Install the test subscriber once; later calls are no-ops.
/// Run with `RUST_LOG=hybrid_retrieval=debug` to see pipeline traces.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct StoredPassage {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

pub fn passage(id: &str, similarity: f32, text: &str) -> StoredPassage {
    StoredPassage {
        id: PointId::from(id),
        vector: vec![similarity],
        payload: Payload::with_text(text),
    }
}

pub struct MockIndex {
    passages: Vec<StoredPassage>,
    pub search_queries: Mutex<Vec<IndexQuery>>,
    fail: bool,
    fail_scroll_needle: Option<String>,
}

impl MockIndex {
    pub fn new(passages: Vec<StoredPassage>) -> Self {
        Self {
            passages,
            search_queries: Mutex::new(Vec::new()),
            fail: false,
            fail_scroll_needle: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            passages: Vec::new(),
            search_queries: Mutex::new(Vec::new()),
            fail: true,
            fail_scroll_needle: None,
        }
    }

    /// Fail any scroll whose filter substring-matches against `needle`,
    /// leaving every other sub-query healthy
    pub fn failing_scroll_on(mut self, needle: &str) -> Self {
        self.fail_scroll_needle = Some(needle.to_string());
        self
    }

    fn matches(&self, payload: &Payload, filter: Option<&Filter>) -> bool {
        let Some(filter) = filter else { return true };
        filter.must.iter().all(|c| clause_matches(payload, c))
            && !filter.must_not.iter().any(|c| clause_matches(payload, c))
            // hard "at least one should matches" interpretation, the very
            // behavior soft-preference stripping protects against
            && (filter.should.is_empty()
                || filter.should.iter().any(|c| clause_matches(payload, c)))
    }
}

fn field_value(payload: &Payload, key: &str) -> Option<Value> {
    match key {
        "content_type" => payload.content_type.clone().map(Value::from),
        "lang" => payload.lang.clone().map(Value::from),
        "text" => payload.text.clone().map(Value::from),
        "quality_score" => payload
            .quality_score
            .map(|q| Value::from(q as f64)),
        _ => payload.extra.get(key).cloned(),
    }
}

fn clause_matches(payload: &Payload, clause: &Clause) -> bool {
    match clause {
        Clause::Match { key, value } => field_value(payload, key).as_ref() == Some(value),
        Clause::MatchAny { key, values } => field_value(payload, key)
            .map(|v| values.contains(&v))
            .unwrap_or(false),
        Clause::MatchText { key, text } => field_value(payload, key)
            .and_then(|v| v.as_str().map(|s| s.to_lowercase().contains(&text.to_lowercase())))
            .unwrap_or(false),
        Clause::Range { key, gte, lte } => field_value(payload, key)
            .and_then(|v| v.as_f64())
            .map(|n| gte.map_or(true, |lo| n >= lo) && lte.map_or(true, |hi| n <= hi))
            .unwrap_or(false),
    }
}

#[async_trait]
impl IndexClient for MockIndex {
    async fn search(&self, _collection: &str, query: IndexQuery) -> Result<Vec<IndexPoint>> {
        if self.fail {
            return Err(SearchError::IndexUnavailable(
                "index connection refused".into(),
            ));
        }
        self.search_queries.lock().unwrap().push(query.clone());

        let mut points: Vec<IndexPoint> = self
            .passages
            .iter()
            .filter(|p| self.matches(&p.payload, query.filter.as_ref()))
            .map(|p| {
                let score: f32 = p
                    .vector
                    .iter()
                    .zip(&query.vector)
                    .map(|(a, b)| a * b)
                    .sum();
                IndexPoint {
                    id: p.id.clone(),
                    score,
                    payload: query.with_payload.then(|| p.payload.clone()),
                    vector: query.with_vector.then(|| p.vector.clone()),
                }
            })
            .filter(|p| query.score_threshold.map_or(true, |t| p.score >= t))
            .collect();

        points.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        points.truncate(query.limit);
        Ok(points)
    }

    async fn scroll(&self, _collection: &str, request: ScrollRequest) -> Result<ScrollResponse> {
        if self.fail {
            return Err(SearchError::IndexUnavailable(
                "index connection refused".into(),
            ));
        }
        if let (Some(needle), Some(filter)) = (&self.fail_scroll_needle, request.filter.as_ref()) {
            let targeted = filter
                .must
                .iter()
                .any(|c| matches!(c, Clause::MatchText { text, .. } if text == needle));
            if targeted {
                return Err(SearchError::IndexUnavailable("scroll timed out".into()));
            }
        }
        let points: Vec<ScrollPoint> = self
            .passages
            .iter()
            .filter(|p| self.matches(&p.payload, request.filter.as_ref()))
            .take(request.limit)
            .map(|p| ScrollPoint {
                id: p.id.clone(),
                payload: request.with_payload.then(|| p.payload.clone()),
            })
            .collect();
        Ok(ScrollResponse {
            points,
            next_page_offset: None,
        })
    }

    async fn count(&self, _collection: &str, filter: Option<Filter>, _exact: bool) -> Result<u64> {
        Ok(self
            .passages
            .iter()
            .filter(|p| self.matches(&p.payload, filter.as_ref()))
            .count() as u64)
    }
}

pub struct SimpleVariants {
    extra: Vec<String>,
}

impl SimpleVariants {
    pub fn new() -> Self {
        Self { extra: Vec::new() }
    }

    /// Additional variants returned after the lower-cased original term
    pub fn with_extra(extra: &[&str]) -> Self {
        Self {
            extra: extra.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl QueryVariantGenerator for SimpleVariants {
    fn generate_query_variants(&self, term: &str) -> Vec<String> {
        let mut variants = vec![term.to_lowercase()];
        variants.extend(self.extra.iter().cloned());
        variants
    }

    fn normalize_query(&self, term: &str) -> String {
        term.trim().to_lowercase()
    }

    fn tokenize_query(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(|t| t.to_string()).collect()
    }
}
