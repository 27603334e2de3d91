//! Adaptive strategy selection, dynamic thresholds and the quality gate
//!
//! RRF needs a reasonably deep, reasonably confident text ranking to be
//! meaningful; below that it degrades into an unstable tie-breaker. The
//! selector therefore demotes to a weighted blend that leans on the
//! always-available vector signal whenever the text leg came back thin.

use tracing::debug;

use crate::config::HybridConfig;
use crate::fusion::FusionStrategy;
use crate::types::{FusedHit, MatchType, Provenance, TextHit};

/// Weight split when the text signal is too weak to trust
const VECTOR_HEAVY: (f32, f32) = (0.85, 0.15);
/// Weight split for an explicitly weighted request with usable text signal
const BALANCED: (f32, f32) = (0.5, 0.5);

/// Text hits below this count are too shallow for rank fusion
const MIN_TEXT_DEPTH_FOR_RRF: usize = 3;

/// Realized statistics of one text-search run
#[derive(Debug, Clone)]
pub struct TextStats {
    pub count: usize,
    /// At least one hit matched via the exact term or a query variant,
    /// as opposed to the token fallback
    pub has_real_matches: bool,
    /// Distinct match types in order of first appearance
    pub match_types: Vec<MatchType>,
}

impl TextStats {
    pub fn from_hits(hits: &[TextHit]) -> Self {
        let mut match_types = Vec::new();
        for hit in hits {
            if !match_types.contains(&hit.match_type) {
                match_types.push(hit.match_type);
            }
        }
        Self {
            count: hits.len(),
            has_real_matches: hits
                .iter()
                .any(|h| matches!(h.match_type, MatchType::Exact | MatchType::Variant)),
            match_types,
        }
    }
}

/// Outcome of strategy selection
#[derive(Debug, Clone, Copy)]
pub struct StrategyDecision {
    pub strategy: FusionStrategy,
    pub vector_weight: f32,
    pub text_weight: f32,
    /// True when a nominal RRF request was demoted to weighted fusion
    pub downgraded: bool,
}

/// Pick the fusion strategy and weight split for the realized text signal.
/// Rules are evaluated in order; the first match wins.
pub fn select_strategy(use_rrf: bool, stats: &TextStats, config: &HybridConfig) -> StrategyDecision {
    let decision = if use_rrf && stats.count > 0 && !stats.has_real_matches {
        // only token-fallback hits: too noisy to rank against
        weighted(VECTOR_HEAVY, true)
    } else if use_rrf && stats.count == 0 {
        weighted(VECTOR_HEAVY, true)
    } else if use_rrf && stats.count < MIN_TEXT_DEPTH_FOR_RRF {
        weighted(VECTOR_HEAVY, true)
    } else if !use_rrf && (stats.count == 0 || !stats.has_real_matches) {
        weighted(VECTOR_HEAVY, false)
    } else if !use_rrf {
        weighted(BALANCED, false)
    } else {
        StrategyDecision {
            strategy: FusionStrategy::Rrf,
            vector_weight: config.vector_weight,
            text_weight: config.text_weight,
            downgraded: false,
        }
    };

    debug!(
        strategy = ?decision.strategy,
        vector_weight = decision.vector_weight,
        text_weight = decision.text_weight,
        downgraded = decision.downgraded,
        text_hits = stats.count,
        real_matches = stats.has_real_matches,
        "fusion strategy selected"
    );
    decision
}

fn weighted((vector_weight, text_weight): (f32, f32), downgraded: bool) -> StrategyDecision {
    StrategyDecision {
        strategy: FusionStrategy::Weighted,
        vector_weight,
        text_weight,
        downgraded,
    }
}

/// Raise the vector threshold to the configured floor: a stricter one when no
/// text corroboration exists, a softer one when it does. Disabled dynamic
/// thresholds leave the base unchanged.
pub fn effective_threshold(base: f32, has_text_matches: bool, config: &HybridConfig) -> f32 {
    if !config.dynamic_thresholds {
        return base;
    }
    let floor = if has_text_matches {
        config.min_score_with_text
    } else {
        config.min_score_vector_only
    };
    base.max(floor)
}

/// Post-fusion quality gate: drop hits below the global floor, and
/// vector-only hits below the stricter vector-only floor. Idempotent; an
/// empty or disabled input passes through unchanged.
///
/// Weighted scores live in roughly [0, 1] while raw RRF scores sit near
/// `1/k`, so each strategy gates against its own floor pair.
pub fn quality_gate(
    hits: Vec<FusedHit>,
    strategy: FusionStrategy,
    config: &HybridConfig,
) -> Vec<FusedHit> {
    if !config.quality_gate || hits.is_empty() {
        return hits;
    }
    let (floor, vector_only_floor) = match strategy {
        FusionStrategy::Rrf => (config.quality_floor_rrf, config.quality_floor_rrf_vector_only),
        FusionStrategy::Weighted => (config.quality_floor, config.quality_floor_vector_only),
    };
    let before = hits.len();
    let kept: Vec<FusedHit> = hits
        .into_iter()
        .filter(|hit| {
            if hit.score < floor {
                return false;
            }
            if hit.provenance == Provenance::Vector && hit.score < vector_only_floor {
                return false;
            }
            true
        })
        .collect();

    if kept.len() < before {
        debug!(dropped = before - kept.len(), kept = kept.len(), "quality gate");
    }
    kept
}
