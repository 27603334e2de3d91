//! Hybrid search orchestrator
//!
//! Composes the text and vector legs, adaptive strategy selection, fusion
//! and the quality gate into one call. The text leg runs first because the
//! dynamic vector threshold depends on how much text signal materialized.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::client::{IndexClient, IntentFilterTranslator, QueryVariantGenerator};
use crate::config::HybridConfig;
use crate::error::{Result, SearchError};
use crate::filter::Filter;
use crate::fusion::{fuse_rrf, fuse_weighted, FusionStrategy};
use crate::ranking::{effective_threshold, quality_gate, select_strategy, TextStats};
use crate::text::TextSearch;
use crate::types::{
    HybridMetadata, HybridResponse, HybridSearchOptions, ScoredHit, SearchIntent, TextHit,
    VectorSearchOptions,
};
use crate::vector::VectorSearch;

/// Default over-fetch multiplier for the text candidate pool
const TEXT_RECALL_FACTOR: usize = 4;
/// The vector pool is fetched half again as deep as the text pool
const VECTOR_RECALL_FACTOR: f32 = 1.5;

/// Hybrid search engine combining vector and text search
pub struct HybridSearch {
    vector: VectorSearch,
    text: TextSearch,
    config: HybridConfig,
}

impl HybridSearch {
    /// Create a new hybrid search engine over the injected collaborators
    pub fn new(
        index: Arc<dyn IndexClient>,
        variants: Arc<dyn QueryVariantGenerator>,
        config: HybridConfig,
    ) -> Self {
        info!("initializing hybrid retrieval engine");
        Self {
            vector: VectorSearch::new(index.clone(), config.clone()),
            text: TextSearch::new(index, variants),
            config,
        }
    }

    /// Attach an intent-to-filter translator for intent-aware vector search
    pub fn with_translator(mut self, translator: Arc<dyn IntentFilterTranslator>) -> Self {
        self.vector = self.vector.with_translator(translator);
        self
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Quality-aware vector search, exposed for callers that already have a
    /// filter and no query text
    pub async fn vector_search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        filter: Option<Filter>,
        options: &VectorSearchOptions,
    ) -> Result<Vec<ScoredHit>> {
        self.vector.search_quality(collection, vector, filter, options).await
    }

    /// Intent-aware vector search; see [`VectorSearch::search_with_intent`]
    pub async fn vector_search_with_intent(
        &self,
        collection: &str,
        vector: Vec<f32>,
        base_filter: Option<Filter>,
        intent: &SearchIntent,
        ready_filter: Option<Filter>,
        options: &VectorSearchOptions,
    ) -> Result<Vec<ScoredHit>> {
        self.vector
            .search_with_intent(collection, vector, base_filter, intent, ready_filter, options)
            .await
    }

    /// Text-only search, exposed for callers without a query vector
    pub async fn text_search(
        &self,
        collection: &str,
        term: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Vec<TextHit> {
        self.text.search(collection, term, filter, limit).await
    }

    /// Full hybrid pipeline: text recall, dynamic threshold, vector recall,
    /// adaptive fusion, quality gate. Any stage failure is wrapped once as
    /// [`SearchError::HybridSearchFailed`]; partial results are never
    /// returned as success.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        query_text: &str,
        filter: Option<Filter>,
        options: &HybridSearchOptions,
    ) -> Result<HybridResponse> {
        let started = Instant::now();
        self.run_pipeline(collection, vector, query_text, filter, options, started)
            .await
            .map_err(|e| SearchError::HybridSearchFailed(e.to_string()))
    }

    async fn run_pipeline(
        &self,
        collection: &str,
        vector: Vec<f32>,
        query_text: &str,
        filter: Option<Filter>,
        options: &HybridSearchOptions,
        started: Instant,
    ) -> Result<HybridResponse> {
        let limit = options.limit;
        let text_recall = text_recall_limit(limit, options.recall_limit);

        // (a) text leg first; its statistics drive the stages below
        let text_hits = self
            .text
            .search(collection, query_text, filter.as_ref(), text_recall)
            .await;
        let stats = TextStats::from_hits(&text_hits);

        // (b) + (c) vector leg with the dynamic threshold
        let threshold =
            effective_threshold(options.score_threshold, stats.count > 0, &self.config);
        let vector_options = VectorSearchOptions::new()
            .with_limit(vector_recall_limit(limit, text_recall))
            .with_score_threshold(threshold);
        let vector_options = match options.ef_search {
            Some(ef) => vector_options.with_ef_search(ef),
            None => vector_options,
        };
        let vector_hits = self
            .vector
            .search_quality(collection, vector, filter, &vector_options)
            .await?;

        // (d) + (e) pick a strategy against the realized text signal and fuse
        let decision = select_strategy(options.use_rrf, &stats, &self.config);
        let fused = match decision.strategy {
            FusionStrategy::Rrf => fuse_rrf(&vector_hits, &text_hits, &self.config, limit),
            FusionStrategy::Weighted => fuse_weighted(
                &vector_hits,
                &text_hits,
                decision.vector_weight,
                decision.text_weight,
                limit,
            ),
        };

        // (f) quality gate
        let results = quality_gate(fused, decision.strategy, &self.config);

        debug!(
            collection,
            vector_hits = vector_hits.len(),
            text_hits = text_hits.len(),
            returned = results.len(),
            strategy = ?decision.strategy,
            threshold,
            "hybrid search complete"
        );

        let metadata = HybridMetadata {
            vector_count: vector_hits.len(),
            text_count: text_hits.len(),
            returned: results.len(),
            strategy: decision.strategy,
            vector_weight: decision.vector_weight,
            text_weight: decision.text_weight,
            rrf_downgraded: decision.downgraded,
            match_types: stats.match_types,
            effective_threshold: threshold,
            took_ms: started.elapsed().as_millis() as u64,
        };

        Ok(HybridResponse { results, metadata })
    }
}

/// `max(limit, recall_limit ?? limit * 4)`
fn text_recall_limit(limit: usize, recall_limit: Option<usize>) -> usize {
    limit.max(recall_limit.unwrap_or(limit.saturating_mul(TEXT_RECALL_FACTOR)))
}

/// `max(limit, round(text_recall * 1.5))`
fn vector_recall_limit(limit: usize, text_recall: usize) -> usize {
    limit.max((text_recall as f32 * VECTOR_RECALL_FACTOR).round() as usize)
}
