//! Collaborator traits
//!
//! The engine does not own an index, a tokenizer, or an intent model; those
//! live in sibling services and are injected behind these traits at
//! construction. Implementations must be `Send + Sync` so one engine handle
//! can serve concurrent requests.

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::Filter;
use crate::types::{Payload, PointId, SearchIntent};

/// One nearest-neighbor query against a collection
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub vector: Vec<f32>,
    pub filter: Option<Filter>,
    pub limit: usize,
    pub score_threshold: Option<f32>,
    pub with_payload: bool,
    pub with_vector: bool,
    /// HNSW ef override for this query
    pub hnsw_ef: Option<u64>,
}

/// Raw point returned by the index
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: Option<Payload>,
    pub vector: Option<Vec<f32>>,
}

/// Filtered paging request (no vector involved)
#[derive(Debug, Clone)]
pub struct ScrollRequest {
    pub filter: Option<Filter>,
    pub limit: usize,
    pub offset: Option<PointId>,
    pub with_payload: bool,
}

/// One page of scroll results
#[derive(Debug, Clone)]
pub struct ScrollResponse {
    pub points: Vec<ScrollPoint>,
    pub next_page_offset: Option<PointId>,
}

#[derive(Debug, Clone)]
pub struct ScrollPoint {
    pub id: PointId,
    pub payload: Option<Payload>,
}

/// Vector index backend.
///
/// `search` must return hits sorted descending by score; the engine relies on
/// that ordering for ranking and fusion.
#[async_trait]
pub trait IndexClient: Send + Sync {
    async fn search(&self, collection: &str, query: IndexQuery) -> Result<Vec<IndexPoint>>;

    async fn scroll(&self, collection: &str, request: ScrollRequest) -> Result<ScrollResponse>;

    async fn count(&self, collection: &str, filter: Option<Filter>, exact: bool) -> Result<u64>;
}

/// Query-variant expansion and tokenization (pure, synchronous)
pub trait QueryVariantGenerator: Send + Sync {
    /// Ordered variants for a raw term; the first variant equal to the
    /// lower-cased term counts as the exact variant
    fn generate_query_variants(&self, term: &str) -> Vec<String>;

    fn normalize_query(&self, term: &str) -> String;

    fn tokenize_query(&self, text: &str) -> Vec<String>;
}

/// Optional intent-to-filter translation.
///
/// Any error here degrades to searching with the base filter alone; the
/// translator can never fail a request.
#[async_trait]
pub trait IntentFilterTranslator: Send + Sync {
    async fn generate_search_filters(&self, intent: &SearchIntent) -> Result<Filter>;
}
