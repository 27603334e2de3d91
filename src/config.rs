//! Process-wide tunables for the hybrid engine
//!
//! Loaded once at startup and shared read-only across concurrent requests.

use serde::Deserialize;

/// Configuration for hybrid search
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Raise the vector score threshold based on text-search corroboration
    pub dynamic_thresholds: bool,
    /// Vector score floor when text search found nothing
    pub min_score_vector_only: f32,
    /// Vector score floor when text matches corroborate the query
    pub min_score_with_text: f32,

    /// Drop low-confidence fused results after fusion
    pub quality_gate: bool,
    /// Global post-fusion score floor for weighted-combination scores
    pub quality_floor: f32,
    /// Stricter weighted-scale floor for hits only the vector leg produced
    pub quality_floor_vector_only: f32,
    /// Global post-fusion floor for RRF scores, which sit near `1/k`
    pub quality_floor_rrf: f32,
    /// Stricter RRF-scale floor for hits only the vector leg produced
    pub quality_floor_rrf_vector_only: f32,

    /// Scale RRF scores by cross-modality agreement
    pub confidence_weighting: bool,
    /// Multiplier when both modalities returned the hit
    pub confidence_boost: f32,
    /// Multiplier when only the vector leg returned the hit
    pub confidence_penalty: f32,

    /// RRF k parameter (default: 60)
    pub rrf_k: f32,
    /// Nominal weight for vector results, used when fusion is weighted
    pub vector_weight: f32,
    /// Nominal weight for text results, used when fusion is weighted
    pub text_weight: f32,

    /// Drop vector hits whose payload quality is below this (absent quality always kept)
    pub min_quality: Option<f32>,
    /// Quality rescoring factor: >1 rewards high-quality content
    pub quality_boost: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            dynamic_thresholds: true,
            min_score_vector_only: 0.5,
            min_score_with_text: 0.3,
            quality_gate: true,
            quality_floor: 0.25,
            quality_floor_vector_only: 0.4,
            quality_floor_rrf: 0.01,
            quality_floor_rrf_vector_only: 0.012,
            confidence_weighting: true,
            confidence_boost: 1.15,
            confidence_penalty: 0.9,
            rrf_k: 60.0,
            vector_weight: 0.7,
            text_weight: 0.3,
            min_quality: None,
            quality_boost: 1.2,
        }
    }
}

impl HybridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dynamic_thresholds(mut self, enabled: bool) -> Self {
        self.dynamic_thresholds = enabled;
        self
    }

    pub fn with_score_floors(mut self, vector_only: f32, with_text: f32) -> Self {
        self.min_score_vector_only = vector_only;
        self.min_score_with_text = with_text;
        self
    }

    pub fn with_quality_gate(mut self, enabled: bool, floor: f32, vector_only_floor: f32) -> Self {
        self.quality_gate = enabled;
        self.quality_floor = floor;
        self.quality_floor_vector_only = vector_only_floor;
        self
    }

    pub fn with_rrf_gate_floors(mut self, floor: f32, vector_only_floor: f32) -> Self {
        self.quality_floor_rrf = floor;
        self.quality_floor_rrf_vector_only = vector_only_floor;
        self
    }

    pub fn with_confidence_weighting(mut self, enabled: bool, boost: f32, penalty: f32) -> Self {
        self.confidence_weighting = enabled;
        self.confidence_boost = boost;
        self.confidence_penalty = penalty;
        self
    }

    pub fn with_weights(mut self, vector: f32, text: f32) -> Self {
        self.vector_weight = vector;
        self.text_weight = text;
        self
    }

    pub fn with_rrf_k(mut self, k: f32) -> Self {
        self.rrf_k = k;
        self
    }

    pub fn with_min_quality(mut self, min_quality: f32) -> Self {
        self.min_quality = Some(min_quality);
        self
    }

    pub fn with_quality_boost(mut self, boost: f32) -> Self {
        self.quality_boost = boost;
        self
    }

    /// Load overrides from `HYBRID_*` environment variables.
    ///
    /// Unset or unparseable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_bool("HYBRID_DYNAMIC_THRESHOLDS") {
            config.dynamic_thresholds = v;
        }
        if let Some(v) = env_f32("HYBRID_MIN_SCORE_VECTOR_ONLY") {
            config.min_score_vector_only = v;
        }
        if let Some(v) = env_f32("HYBRID_MIN_SCORE_WITH_TEXT") {
            config.min_score_with_text = v;
        }
        if let Some(v) = env_bool("HYBRID_QUALITY_GATE") {
            config.quality_gate = v;
        }
        if let Some(v) = env_f32("HYBRID_QUALITY_FLOOR") {
            config.quality_floor = v;
        }
        if let Some(v) = env_f32("HYBRID_QUALITY_FLOOR_VECTOR_ONLY") {
            config.quality_floor_vector_only = v;
        }
        if let Some(v) = env_f32("HYBRID_QUALITY_FLOOR_RRF") {
            config.quality_floor_rrf = v;
        }
        if let Some(v) = env_f32("HYBRID_QUALITY_FLOOR_RRF_VECTOR_ONLY") {
            config.quality_floor_rrf_vector_only = v;
        }
        if let Some(v) = env_bool("HYBRID_CONFIDENCE_WEIGHTING") {
            config.confidence_weighting = v;
        }
        if let Some(v) = env_f32("HYBRID_CONFIDENCE_BOOST") {
            config.confidence_boost = v;
        }
        if let Some(v) = env_f32("HYBRID_CONFIDENCE_PENALTY") {
            config.confidence_penalty = v;
        }
        if let Some(v) = env_f32("HYBRID_RRF_K") {
            config.rrf_k = v;
        }
        if let Some(v) = env_f32("HYBRID_VECTOR_WEIGHT") {
            config.vector_weight = v;
        }
        if let Some(v) = env_f32("HYBRID_TEXT_WEIGHT") {
            config.text_weight = v;
        }
        if let Some(v) = env_f32("HYBRID_MIN_QUALITY") {
            config.min_quality = Some(v);
        }
        if let Some(v) = env_f32("HYBRID_QUALITY_BOOST") {
            config.quality_boost = v;
        }

        config
    }
}

fn env_f32(key: &str) -> Option<f32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| match v.as_str() {
        "1" | "true" | "TRUE" => Some(true),
        "0" | "false" | "FALSE" => Some(false),
        _ => None,
    })
}
