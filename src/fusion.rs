//! Score fusion for the two retrieval legs
//!
//! Two interchangeable strategies: Reciprocal Rank Fusion and a weighted
//! linear combination. Both accumulate contributions additively per
//! identifier - a hit present in both lists always scores at least as much
//! as it would from either list alone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::HybridConfig;
use crate::types::{FusedHit, Payload, PointId, Provenance, ScoredHit, TextHit};

/// Fusion strategy for combining search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Reciprocal Rank Fusion (default)
    #[default]
    Rrf,
    /// Weighted linear combination of the raw scores
    Weighted,
}

/// Per-identifier accumulator shared by both strategies
struct Accumulator {
    score: f32,
    payload: Payload,
    vector_score: Option<f32>,
    text_score: Option<f32>,
}

/// Reciprocal Rank Fusion: each list contributes `1/(k + rank + 1)` per hit,
/// contributions for a shared identifier are added (uncapped). When
/// confidence weighting is enabled, hybrid hits get the configured boost and
/// vector-only hits the configured penalty; text-only hits stay at 1.0.
pub fn fuse_rrf(
    vector_hits: &[ScoredHit],
    text_hits: &[TextHit],
    config: &HybridConfig,
    limit: usize,
) -> Vec<FusedHit> {
    let k = config.rrf_k;
    let mut scores: HashMap<PointId, Accumulator> = HashMap::new();

    for (rank, hit) in vector_hits.iter().enumerate() {
        let contribution = 1.0 / (k + rank as f32 + 1.0);
        scores.insert(
            hit.id.clone(),
            Accumulator {
                score: contribution,
                payload: hit.payload.clone(),
                vector_score: Some(hit.score),
                text_score: None,
            },
        );
    }

    for (rank, hit) in text_hits.iter().enumerate() {
        let contribution = 1.0 / (k + rank as f32 + 1.0);
        scores
            .entry(hit.id.clone())
            .and_modify(|acc| {
                acc.score += contribution;
                acc.text_score = Some(hit.score);
            })
            .or_insert_with(|| Accumulator {
                score: contribution,
                payload: hit.payload.clone(),
                vector_score: None,
                text_score: Some(hit.score),
            });
    }

    let mut results: Vec<FusedHit> = scores
        .into_iter()
        .map(|(id, acc)| {
            let provenance = provenance_of(acc.vector_score, acc.text_score);
            let confidence = if config.confidence_weighting {
                match provenance {
                    Provenance::Hybrid => config.confidence_boost,
                    Provenance::Vector => config.confidence_penalty,
                    Provenance::Text => 1.0,
                }
            } else {
                1.0
            };
            FusedHit {
                id,
                score: acc.score * confidence,
                payload: acc.payload,
                provenance,
                vector_score: acc.vector_score,
                text_score: acc.text_score,
                confidence: Some(confidence),
                raw_rrf_score: Some(acc.score),
            }
        })
        .collect();

    sort_and_truncate(&mut results, limit);
    results
}

/// Weighted linear combination: normalize the two weights to sum to 1, each
/// hit contributes `own_score * weight`, shared identifiers sum. No
/// confidence multiplier in this strategy.
pub fn fuse_weighted(
    vector_hits: &[ScoredHit],
    text_hits: &[TextHit],
    vector_weight: f32,
    text_weight: f32,
    limit: usize,
) -> Vec<FusedHit> {
    let (nv, nt) = normalized_weights(vector_weight, text_weight);
    let mut scores: HashMap<PointId, Accumulator> = HashMap::new();

    for hit in vector_hits {
        scores.insert(
            hit.id.clone(),
            Accumulator {
                score: hit.score * nv,
                payload: hit.payload.clone(),
                vector_score: Some(hit.score),
                text_score: None,
            },
        );
    }

    for hit in text_hits {
        scores
            .entry(hit.id.clone())
            .and_modify(|acc| {
                acc.score += hit.score * nt;
                acc.text_score = Some(hit.score);
            })
            .or_insert_with(|| Accumulator {
                score: hit.score * nt,
                payload: hit.payload.clone(),
                vector_score: None,
                text_score: Some(hit.score),
            });
    }

    let mut results: Vec<FusedHit> = scores
        .into_iter()
        .map(|(id, acc)| FusedHit {
            id,
            score: acc.score,
            payload: acc.payload,
            provenance: provenance_of(acc.vector_score, acc.text_score),
            vector_score: acc.vector_score,
            text_score: acc.text_score,
            confidence: None,
            raw_rrf_score: None,
        })
        .collect();

    sort_and_truncate(&mut results, limit);
    results
}

/// Normalize raw weights so they sum to 1; degenerate zero weights split evenly
pub fn normalized_weights(vector_weight: f32, text_weight: f32) -> (f32, f32) {
    let total = vector_weight + text_weight;
    if total <= 0.0 {
        (0.5, 0.5)
    } else {
        (vector_weight / total, text_weight / total)
    }
}

fn provenance_of(vector_score: Option<f32>, text_score: Option<f32>) -> Provenance {
    match (vector_score, text_score) {
        (Some(_), Some(_)) => Provenance::Hybrid,
        (Some(_), None) => Provenance::Vector,
        (None, _) => Provenance::Text,
    }
}

fn sort_and_truncate(results: &mut Vec<FusedHit>, limit: usize) {
    // id as the final tie-break keeps equal-score orderings stable across
    // runs despite the HashMap accumulation
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    });
    results.truncate(limit);
}
