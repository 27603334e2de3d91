//! Common types for the retrieval engine

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Point identifier as stored in the index (UUID string or integer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Str(String),
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId::Str(s.to_string())
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Num(n)
    }
}

/// Stored payload of an indexed passage.
///
/// The fields the engine reads (quality, soft-preference metadata, the text
/// body used for term-frequency scoring) are typed; everything else the host
/// platform stores rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Editorial quality in [0, 1]; absent means unrated, never "bad"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Passage text, read by keyword scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Hit returned by vector similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    pub id: PointId,
    /// Similarity score, nominally in [0, 1]; quality rescoring may push it
    /// past the bounds transiently
    pub score: f32,
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// How a text hit matched the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// A variant equal to the lower-cased original term matched
    Exact,
    /// An expanded query variant matched
    Variant,
    /// Only the single-token OR fallback matched
    TokenFallback,
    /// The search errored; hits are best-effort leftovers
    Error,
    /// Nothing matched
    None,
}

/// Retrieval modality that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Vector,
    Text,
    Hybrid,
}

/// Hit returned by keyword/text search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextHit {
    pub id: PointId,
    /// Term-frequency relevance in [0.1, 1.0]
    pub score: f32,
    pub payload: Payload,
    /// Always [`Provenance::Text`]; kept on the hit so fused output and
    /// text-only output share a shape downstream
    pub source: Provenance,
    /// Original search term as given by the caller
    pub term: String,
    /// The query variant that produced this hit
    pub matched_variant: String,
    pub match_type: MatchType,
}

/// Hit produced by score fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedHit {
    pub id: PointId,
    /// Final combined score after any confidence weighting
    pub score: f32,
    pub payload: Payload,
    pub provenance: Provenance,
    /// Original vector similarity, if the vector leg contributed
    pub vector_score: Option<f32>,
    /// Original text relevance, if the text leg contributed
    pub text_score: Option<f32>,
    /// Confidence multiplier applied (RRF only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// RRF score before the confidence multiplier (RRF only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_rrf_score: Option<f32>,
}

/// Options for a single vector search call
#[derive(Debug, Clone)]
pub struct VectorSearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Minimum similarity score
    pub score_threshold: f32,
    /// Return stored payloads with each hit
    pub with_payload: bool,
    /// Return raw vectors with each hit
    pub with_vector: bool,
    /// HNSW ef override for this query
    pub ef_search: Option<u64>,
}

impl Default for VectorSearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            score_threshold: 0.0,
            with_payload: true,
            with_vector: false,
            ef_search: None,
        }
    }
}

impl VectorSearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_vector(mut self, include: bool) -> Self {
        self.with_vector = include;
        self
    }

    pub fn with_ef_search(mut self, ef: u64) -> Self {
        self.ef_search = Some(ef);
        self
    }
}

/// Caller-described search intent, translated into a filter by an external
/// collaborator when no ready-made filter is supplied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIntent {
    /// Free-form description of what the caller is looking for
    pub description: String,
    /// Structured hints the translator may use (topic, audience, ...)
    #[serde(flatten)]
    pub hints: Map<String, Value>,
}

impl SearchIntent {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            hints: Map::new(),
        }
    }
}

/// Options for one hybrid search request
#[derive(Debug, Clone)]
pub struct HybridSearchOptions {
    /// Final number of results to return
    pub limit: usize,
    /// Base vector score threshold; dynamic thresholds may raise it
    pub score_threshold: f32,
    /// Nominal preference for RRF fusion; the adaptive selector may demote it
    pub use_rrf: bool,
    /// Over-fetch size for the candidate pools; defaults to `limit * 4`
    pub recall_limit: Option<usize>,
    /// HNSW ef override passed through to the vector leg
    pub ef_search: Option<u64>,
}

impl Default for HybridSearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            score_threshold: 0.25,
            use_rrf: true,
            recall_limit: None,
            ef_search: None,
        }
    }
}

impl HybridSearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_use_rrf(mut self, use_rrf: bool) -> Self {
        self.use_rrf = use_rrf;
        self
    }

    pub fn with_recall_limit(mut self, recall_limit: usize) -> Self {
        self.recall_limit = Some(recall_limit);
        self
    }
}

/// Per-request diagnostics returned alongside the fused results
#[derive(Debug, Clone, Serialize)]
pub struct HybridMetadata {
    /// Vector candidates retrieved before fusion
    pub vector_count: usize,
    /// Text candidates retrieved before fusion
    pub text_count: usize,
    /// Results surviving fusion and the quality gate
    pub returned: usize,
    /// Fusion strategy actually used
    pub strategy: crate::fusion::FusionStrategy,
    pub vector_weight: f32,
    pub text_weight: f32,
    /// True when the selector demoted a nominal RRF request to weighted
    pub rrf_downgraded: bool,
    /// Distinct match types observed in the text candidates
    pub match_types: Vec<MatchType>,
    /// Vector threshold actually applied after the dynamic floor
    pub effective_threshold: f32,
    pub took_ms: u64,
}

/// Successful hybrid search outcome; failures are [`crate::SearchError`]
#[derive(Debug, Clone, Serialize)]
pub struct HybridResponse {
    pub results: Vec<FusedHit>,
    pub metadata: HybridMetadata,
}
