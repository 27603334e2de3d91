//! Error types for the retrieval engine
//!
//! This module defines the error taxonomy for the hybrid-retrieval library.
//! Per-variant text-search failures are handled inside the text search layer
//! and never surface here; everything else propagates through these types.

use thiserror::Error;

/// Main error type for retrieval operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// Index backend unreachable or returned a transport-level failure
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Malformed filter clause - a caller bug, never retried
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Vector search failed; carries the original index-layer message
    #[error("Vector search failed: {0}")]
    VectorSearchFailed(String),

    /// Hybrid pipeline failed; wrapped once at the orchestrator boundary
    #[error("Hybrid search failed: {0}")]
    HybridSearchFailed(String),
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, SearchError>;

impl From<String> for SearchError {
    fn from(s: String) -> Self {
        SearchError::IndexUnavailable(s)
    }
}

impl From<&str> for SearchError {
    fn from(s: &str) -> Self {
        SearchError::IndexUnavailable(s.to_string())
    }
}
