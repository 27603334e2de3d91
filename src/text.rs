//! Keyword/text search over the index's filtered scroll interface
//!
//! Text search is a best-effort augmentation to the vector leg: per-variant
//! and per-token sub-queries that fail are logged and contribute zero hits,
//! and a total failure yields an empty list instead of an error.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::client::{IndexClient, QueryVariantGenerator, ScrollRequest};
use crate::filter::{Clause, Filter};
use crate::types::{MatchType, Payload, PointId, Provenance, TextHit};

/// Payload field the substring queries and term-frequency scoring run against
const TEXT_FIELD: &str = "text";

/// Minimum token length for the OR fallback
const MIN_FALLBACK_TOKEN_LEN: usize = 4;

/// Extra headroom on top of the per-variant share of the limit
const PER_VARIANT_SLACK: usize = 5;

/// Keyword search engine
pub struct TextSearch {
    index: Arc<dyn IndexClient>,
    variants: Arc<dyn QueryVariantGenerator>,
}

/// Candidate collected during the merge phase, scored afterwards
struct MergedHit {
    id: PointId,
    payload: Payload,
    matched_variant: String,
    match_type: MatchType,
}

impl TextSearch {
    pub fn new(index: Arc<dyn IndexClient>, variants: Arc<dyn QueryVariantGenerator>) -> Self {
        Self { index, variants }
    }

    /// Search for up to `limit` passages matching `term`, ranked by
    /// term-frequency relevance. Never fails: degraded branches only reduce
    /// the number of hits.
    pub async fn search(
        &self,
        collection: &str,
        term: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Vec<TextHit> {
        if term.trim().is_empty() || limit == 0 {
            return Vec::new();
        }

        let lowered = term.to_lowercase();
        let mut variants = self.variants.generate_query_variants(term);
        if variants.is_empty() {
            variants.push(lowered.clone());
        }

        let per_variant_limit = limit.div_ceil(variants.len()) + PER_VARIANT_SLACK;
        let (mut merged, mut degraded) =
            self.fan_out(collection, &variants, filter, per_variant_limit, |variant| {
                if variant == lowered {
                    MatchType::Exact
                } else {
                    MatchType::Variant
                }
            })
            .await;

        if merged.is_empty() {
            (merged, degraded) = self.token_fallback(collection, term, filter, limit).await;
        }

        // a failed sub-query means the merge is incomplete; re-tag the
        // survivors so downstream ranking treats them as weak signal
        if degraded {
            for hit in &mut merged {
                hit.match_type = MatchType::Error;
            }
        }

        let mut hits = self.score_hits(merged, term);
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);

        debug!(collection, term, hits = hits.len(), "text search");
        hits
    }

    /// Run one filtered substring query per variant concurrently and merge by
    /// identifier, first writer wins. The flag reports whether any sub-query
    /// failed, leaving the merge incomplete.
    async fn fan_out(
        &self,
        collection: &str,
        variants: &[String],
        filter: Option<&Filter>,
        per_query_limit: usize,
        tag: impl Fn(&str) -> MatchType,
    ) -> (Vec<MergedHit>, bool) {
        let queries = variants.iter().map(|variant| {
            let request = ScrollRequest {
                filter: Some(substring_filter(filter, variant)),
                limit: per_query_limit,
                offset: None,
                with_payload: true,
            };
            async move {
                match self.index.scroll(collection, request).await {
                    Ok(response) => (variant.clone(), Some(response.points)),
                    Err(e) => {
                        warn!(collection, variant = variant.as_str(), error = %e, "text sub-query failed, contributing zero hits");
                        (variant.clone(), None)
                    }
                }
            }
        });

        let mut merged: Vec<MergedHit> = Vec::new();
        let mut seen: HashSet<PointId> = HashSet::new();
        let mut degraded = false;
        // join order == variant order, so the merge is deterministic no
        // matter which query finished first
        for (variant, points) in join_all(queries).await {
            let Some(points) = points else {
                degraded = true;
                continue;
            };
            for point in points {
                if seen.insert(point.id.clone()) {
                    merged.push(MergedHit {
                        id: point.id,
                        payload: point.payload.unwrap_or_default(),
                        matched_variant: variant.clone(),
                        match_type: tag(&variant),
                    });
                }
            }
        }
        (merged, degraded)
    }

    /// OR-style last resort: split the normalized term into long tokens and
    /// query each one. Requires at least two qualifying tokens.
    async fn token_fallback(
        &self,
        collection: &str,
        term: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> (Vec<MergedHit>, bool) {
        let normalized = self.variants.normalize_query(term);
        let tokens: Vec<String> = self
            .variants
            .tokenize_query(&normalized)
            .into_iter()
            .filter(|t| t.chars().count() >= MIN_FALLBACK_TOKEN_LEN)
            .collect();

        if tokens.len() < 2 {
            debug!(term, qualifying_tokens = tokens.len(), "token fallback skipped");
            return (Vec::new(), false);
        }

        debug!(term, tokens = tokens.len(), "token fallback");
        let per_token_limit = limit.div_ceil(tokens.len()) + PER_VARIANT_SLACK;
        self.fan_out(collection, &tokens, filter, per_token_limit, |_| {
            MatchType::TokenFallback
        })
        .await
    }

    /// Term-frequency scoring over the merged candidates. `rank` is the
    /// hit's index in merge order, before sorting.
    fn score_hits(&self, merged: Vec<MergedHit>, term: &str) -> Vec<TextHit> {
        merged
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| {
                let score = match hit.payload.text.as_deref() {
                    Some(text) => term_frequency_score(text, term, rank),
                    None => 0.1,
                };
                TextHit {
                    id: hit.id,
                    score,
                    payload: hit.payload,
                    source: Provenance::Text,
                    term: term.to_string(),
                    matched_variant: hit.matched_variant,
                    match_type: hit.match_type,
                }
            })
            .collect()
    }
}

/// Base filter plus a substring clause on the text field
fn substring_filter(base: Option<&Filter>, needle: &str) -> Filter {
    let text_clause = Clause::MatchText {
        key: TEXT_FIELD.to_string(),
        text: needle.to_string(),
    };
    match base {
        Some(f) => f.clone().must(text_clause),
        None => Filter::new().must(text_clause),
    }
}

/// Non-overlapping, case-insensitive occurrences of `term` in `text`
pub fn count_matches(text: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    let haystack = text.to_lowercase();
    let needle = term.to_lowercase();
    let mut count = 0;
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        count += 1;
        from += pos + needle.len();
    }
    count
}

/// `min(tf * 0.1, 0.8) * max(0.1, 1 - rank * 0.1) * min(1, len / 10)`,
/// clamped to [0.1, 1.0]
fn term_frequency_score(text: &str, term: &str, rank: usize) -> f32 {
    let occurrences = count_matches(text, term) as f32;
    let raw = (occurrences * 0.1).min(0.8);
    let position_penalty = (1.0 - rank as f32 * 0.1).max(0.1);
    let length_factor = (term.chars().count() as f32 / 10.0).min(1.0);
    (raw * position_penalty * length_factor).clamp(0.1, 1.0)
}
