//! Hybrid retrieval & ranking engine
//!
//! Turns a query (dense vector + raw text) into a ranked set of passages by
//! combining vector similarity search with keyword search, fusing the two
//! rankings (RRF or weighted linear), and filtering the fused list through
//! adaptive thresholds and a quality gate.
//!
//! The index backend, query-variant generation and intent-to-filter
//! translation are external collaborators injected behind the traits in
//! [`client`].

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod hybrid;
pub mod ranking;
pub mod text;
pub mod types;
pub mod vector;

pub use client::{
    IndexClient, IndexPoint, IndexQuery, IntentFilterTranslator, QueryVariantGenerator,
    ScrollPoint, ScrollRequest, ScrollResponse,
};
pub use config::HybridConfig;
pub use error::{Result, SearchError};
pub use filter::{merge_filters, Clause, Filter};
pub use fusion::{fuse_rrf, fuse_weighted, FusionStrategy};
pub use hybrid::HybridSearch;
pub use ranking::{effective_threshold, quality_gate, select_strategy, StrategyDecision, TextStats};
pub use text::TextSearch;
pub use types::{
    FusedHit, HybridMetadata, HybridResponse, HybridSearchOptions, MatchType, Payload, PointId,
    Provenance, ScoredHit, SearchIntent, TextHit, VectorSearchOptions,
};
pub use vector::VectorSearch;
