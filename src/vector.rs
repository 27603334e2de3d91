//! Vector similarity search against the injected index
//!
//! Three layers, innermost first: plain filtered nearest-neighbor search,
//! quality-aware rescoring on top of it, and intent-aware filter derivation
//! on top of that. Callers pick the layer matching how much context they have.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{IndexClient, IndexQuery, IntentFilterTranslator};
use crate::config::HybridConfig;
use crate::error::{Result, SearchError};
use crate::filter::{merge_filters, Filter};
use crate::types::{Payload, ScoredHit, SearchIntent, VectorSearchOptions};

/// Over-fetch multiplier for quality-aware search: rescoring can reorder hits
/// across the limit boundary, so the inner query needs headroom.
const QUALITY_RECALL_FACTOR: usize = 2;

/// Vector search engine over an injected index client
pub struct VectorSearch {
    index: Arc<dyn IndexClient>,
    translator: Option<Arc<dyn IntentFilterTranslator>>,
    config: HybridConfig,
}

impl VectorSearch {
    pub fn new(index: Arc<dyn IndexClient>, config: HybridConfig) -> Self {
        Self {
            index,
            translator: None,
            config,
        }
    }

    /// Attach an intent-to-filter translator for [`Self::search_with_intent`]
    pub fn with_translator(mut self, translator: Arc<dyn IntentFilterTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Plain filtered nearest-neighbor search.
    ///
    /// Soft-preference `should` clauses are stripped before querying (see
    /// [`Filter::strip_soft_should`]); index ordering (descending by score)
    /// is passed through. Index-layer failures become
    /// [`SearchError::VectorSearchFailed`] with the original message.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        filter: Option<Filter>,
        options: &VectorSearchOptions,
    ) -> Result<Vec<ScoredHit>> {
        let filter = match filter {
            Some(f) => {
                f.validate()?;
                f.strip_soft_should().into_query_filter()
            }
            None => None,
        };

        let threshold = (options.score_threshold > 0.0).then_some(options.score_threshold);
        let query = IndexQuery {
            vector: vector.clone(),
            filter: filter.clone(),
            limit: options.limit,
            score_threshold: threshold,
            with_payload: options.with_payload,
            with_vector: options.with_vector,
            hnsw_ef: options.ef_search,
        };

        let points = self
            .index
            .search(collection, query)
            .await
            .map_err(|e| SearchError::VectorSearchFailed(e.to_string()))?;

        debug!(
            collection,
            hits = points.len(),
            threshold = options.score_threshold,
            "vector search"
        );

        if points.is_empty() {
            if let Some(threshold) = threshold {
                self.requery_unthresholded(collection, vector, filter, options, threshold)
                    .await;
            }
        }

        Ok(points
            .into_iter()
            .map(|p| ScoredHit {
                id: p.id,
                score: p.score,
                payload: p.payload.unwrap_or_default(),
                vector: p.vector,
            })
            .collect())
    }

    /// Diagnostic re-query with the threshold forced to zero, to distinguish
    /// "threshold too strict" from "no matching content". Observability only:
    /// never changes the result set, and its own failures are swallowed.
    async fn requery_unthresholded(
        &self,
        collection: &str,
        vector: Vec<f32>,
        filter: Option<Filter>,
        options: &VectorSearchOptions,
        threshold: f32,
    ) {
        let requery = IndexQuery {
            vector,
            filter,
            limit: options.limit,
            score_threshold: None,
            with_payload: false,
            with_vector: false,
            hnsw_ef: options.ef_search,
        };
        match self.index.search(collection, requery).await {
            Ok(points) if points.is_empty() => {
                warn!(collection, "no hits even without score threshold; likely no matching content or embedding mismatch");
            }
            Ok(points) => {
                let top = points.first().map(|p| p.score).unwrap_or(0.0);
                warn!(
                    collection,
                    threshold,
                    unthresholded_hits = points.len(),
                    top_score = top,
                    "hits exist below the score threshold"
                );
            }
            Err(e) => {
                debug!(collection, error = %e, "unthresholded diagnostic re-query failed");
            }
        }
    }

    /// Quality-aware search: drops hits rated below the configured minimum
    /// (unrated hits are always kept), rescales scores by payload quality,
    /// then re-sorts and truncates. Truncation runs after rescoring so
    /// quality can change which hits survive the limit.
    pub async fn search_quality(
        &self,
        collection: &str,
        vector: Vec<f32>,
        filter: Option<Filter>,
        options: &VectorSearchOptions,
    ) -> Result<Vec<ScoredHit>> {
        let recall_options = options
            .clone()
            .with_limit(options.limit.saturating_mul(QUALITY_RECALL_FACTOR).max(1));
        let hits = self.search(collection, vector, filter, &recall_options).await?;

        let retrieved = hits.len();
        let boost = self.config.quality_boost;
        let mut hits: Vec<ScoredHit> = hits
            .into_iter()
            .filter(|hit| match (self.config.min_quality, quality_of(&hit.payload)) {
                (Some(min), Some(q)) => q >= min,
                _ => true,
            })
            .map(|mut hit| {
                hit.score = rescale_by_quality(hit.score, quality_of(&hit.payload), boost);
                hit
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(options.limit);

        debug!(
            collection,
            retrieved,
            kept = hits.len(),
            "quality-aware vector search"
        );
        Ok(hits)
    }

    /// Intent-aware search: merges the caller's filter with an intent-derived
    /// one. With a ready-made filter the translator is skipped entirely; a
    /// translator failure degrades to the base filter alone rather than
    /// failing the request.
    pub async fn search_with_intent(
        &self,
        collection: &str,
        vector: Vec<f32>,
        base_filter: Option<Filter>,
        intent: &SearchIntent,
        ready_filter: Option<Filter>,
        options: &VectorSearchOptions,
    ) -> Result<Vec<ScoredHit>> {
        if ready_filter.is_some() {
            let merged = merge_filters(base_filter, ready_filter);
            return self.search_quality(collection, vector, merged, options).await;
        }

        let derived = match &self.translator {
            Some(translator) => match translator.generate_search_filters(intent).await {
                Ok(filter) => filter.into_query_filter(),
                Err(e) => {
                    warn!(error = %e, "intent filter translation failed, searching with base filter only");
                    None
                }
            },
            None => None,
        };

        let merged = merge_filters(base_filter, derived);
        self.search_quality(collection, vector, merged, options).await
    }
}

fn quality_of(payload: &Payload) -> Option<f32> {
    payload.quality_score
}

/// `score * (1 + (quality - 0.5) * (boost - 1))`; absent quality counts as 1.0
fn rescale_by_quality(score: f32, quality: Option<f32>, boost: f32) -> f32 {
    let quality = quality.unwrap_or(1.0);
    score * (1.0 + (quality - 0.5) * (boost - 1.0))
}
