//! Integration tests for the hybrid search pipeline
//!
//! Verifies:
//! 1. Adaptive strategy selection against realized text statistics
//! 2. Dynamic vector thresholds driven by text corroboration
//! 3. RRF and weighted fusion end to end, including provenance/confidence
//! 4. Quality gate behavior inside the full pipeline
//! 5. Failure propagation: one wrapped error, never silent partial success

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{init_tracing, passage, MockIndex, SimpleVariants};
use hybrid_retrieval::{
    FusionStrategy, HybridConfig, HybridSearch, HybridSearchOptions, MatchType, Provenance,
    SearchError, VectorSearchOptions,
};

fn engine(index: MockIndex, variants: SimpleVariants, config: HybridConfig) -> HybridSearch {
    HybridSearch::new(Arc::new(index), Arc::new(variants), config)
}

/// Neutral quality rescoring so vector similarities pass through unchanged
fn neutral_quality(config: HybridConfig) -> HybridConfig {
    config.with_quality_boost(1.0)
}

#[tokio::test]
async fn test_vector_only_downgrades_to_weighted() -> Result<()> {
    init_tracing();
    // five vector hits, zero text hits: the selector must demote RRF to a
    // 0.85/0.15 weighted blend and the fused list must equal the vector list
    // scaled by 0.85, order unchanged
    let index = MockIndex::new(vec![
        passage("p1", 0.9, "a"),
        passage("p2", 0.8, "b"),
        passage("p3", 0.7, "c"),
        passage("p4", 0.6, "d"),
        passage("p5", 0.5, "e"),
    ]);
    let search = engine(
        index,
        SimpleVariants::new(),
        neutral_quality(HybridConfig::default()),
    );

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Quantencomputer",
            None,
            &HybridSearchOptions::new(),
        )
        .await?;

    let meta = &response.metadata;
    assert_eq!(meta.text_count, 0);
    assert_eq!(meta.strategy, FusionStrategy::Weighted);
    assert_eq!((meta.vector_weight, meta.text_weight), (0.85, 0.15));
    assert!(meta.rrf_downgraded);
    // no text corroboration: the stricter vector-only floor applies
    assert_eq!(meta.effective_threshold, 0.5);

    let expected_sims = [0.9f32, 0.8, 0.7, 0.6, 0.5];
    assert_eq!(response.results.len(), 5);
    for (hit, sim) in response.results.iter().zip(expected_sims) {
        assert!((hit.score - sim * 0.85).abs() < 1e-6);
        assert_eq!(hit.provenance, Provenance::Vector);
    }
    Ok(())
}

#[tokio::test]
async fn test_rrf_with_deep_text_signal() -> Result<()> {
    let index = MockIndex::new(vec![
        passage("p1", 0.9, "Klimaschutz in der Stadt"),
        passage("p2", 0.8, "Klimaschutz auf dem Land"),
        passage("p3", 0.7, "Klimaschutz und Verkehr"),
        passage("p4", 0.6, "völlig anderes Thema"),
    ]);
    let search = engine(
        index,
        SimpleVariants::new(),
        neutral_quality(HybridConfig::default()),
    );

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Klimaschutz",
            None,
            &HybridSearchOptions::new(),
        )
        .await?;

    let meta = &response.metadata;
    assert_eq!(meta.text_count, 3);
    assert_eq!(meta.strategy, FusionStrategy::Rrf);
    assert!(!meta.rrf_downgraded);
    assert_eq!(meta.match_types, vec![MatchType::Exact]);
    // text corroboration exists: the softer floor applies
    assert_eq!(meta.effective_threshold, 0.3);
    // the RRF-scale gate floors keep every fused hit
    assert_eq!(response.results.len(), 4);

    let p1 = response
        .results
        .iter()
        .find(|h| h.id.to_string() == "p1")
        .unwrap();
    assert_eq!(p1.provenance, Provenance::Hybrid);
    assert_eq!(p1.confidence, Some(1.15));
    assert!(p1.vector_score.is_some() && p1.text_score.is_some());

    let p4 = response
        .results
        .iter()
        .find(|h| h.id.to_string() == "p4")
        .unwrap();
    assert_eq!(p4.provenance, Provenance::Vector);
    assert_eq!(p4.confidence, Some(0.9));

    // dual presence at comparable rank always beats single presence
    assert!(p1.score > p4.score);
    Ok(())
}

#[tokio::test]
async fn test_default_config_rrf_returns_results() -> Result<()> {
    // out-of-the-box settings: an RRF fusion run must survive its own
    // quality gate, not come back empty
    let index = MockIndex::new(vec![
        passage("p1", 0.9, "Solarenergie auf dem Dach"),
        passage("p2", 0.8, "Solarenergie im Netz"),
        passage("p3", 0.7, "Solarenergie und Speicher"),
    ]);
    let search = engine(index, SimpleVariants::new(), HybridConfig::default());

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Solarenergie",
            None,
            &HybridSearchOptions::new(),
        )
        .await?;

    assert_eq!(response.metadata.strategy, FusionStrategy::Rrf);
    assert_eq!(response.metadata.vector_count, 3);
    assert_eq!(response.metadata.text_count, 3);
    assert!(!response.results.is_empty());
    assert_eq!(response.metadata.returned, 3);
    Ok(())
}

#[tokio::test]
async fn test_shallow_variant_text_downgrades() -> Result<()> {
    // two variant-tagged hits (no exact): depth < 3 demotes RRF
    let index = MockIndex::new(vec![
        passage("p1", 0.9, "Neues Klimagesetz beschlossen"),
        passage("p2", 0.8, "Klimagesetz im Bundesrat"),
    ]);
    let search = engine(
        index,
        SimpleVariants::with_extra(&["klimagesetz"]),
        neutral_quality(HybridConfig::default()),
    );

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Klimapolitik",
            None,
            &HybridSearchOptions::new(),
        )
        .await?;

    let meta = &response.metadata;
    assert_eq!(meta.text_count, 2);
    assert_eq!(meta.match_types, vec![MatchType::Variant]);
    assert_eq!(meta.strategy, FusionStrategy::Weighted);
    assert_eq!((meta.vector_weight, meta.text_weight), (0.85, 0.15));
    assert!(meta.rrf_downgraded);
    Ok(())
}

#[tokio::test]
async fn test_quality_gate_in_pipeline() -> Result<()> {
    // weighted scores: 0.7 * 0.85 = 0.595 survives the 0.5 vector-only
    // floor, 0.55 * 0.85 = 0.4675 does not
    let index = MockIndex::new(vec![
        passage("strong", 0.7, "x"),
        passage("weak", 0.55, "y"),
    ]);
    let config = neutral_quality(HybridConfig::default())
        .with_score_floors(0.5, 0.3)
        .with_quality_gate(true, 0.3, 0.5);
    let search = engine(index, SimpleVariants::new(), config);

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Quantencomputer",
            None,
            &HybridSearchOptions::new(),
        )
        .await?;

    let ids: Vec<String> = response.results.iter().map(|h| h.id.to_string()).collect();
    assert_eq!(ids, vec!["strong"]);
    assert_eq!(response.metadata.vector_count, 2);
    assert_eq!(response.metadata.returned, 1);
    Ok(())
}

#[tokio::test]
async fn test_explicit_weighted_request_with_text_signal() -> Result<()> {
    let index = MockIndex::new(vec![
        passage("p1", 0.9, "Wasserstoff als Energieträger"),
        passage("p2", 0.8, "Wasserstoff im Verkehr"),
    ]);
    let search = engine(
        index,
        SimpleVariants::new(),
        neutral_quality(HybridConfig::default()),
    );

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Wasserstoff",
            None,
            &HybridSearchOptions::new().with_use_rrf(false),
        )
        .await?;

    let meta = &response.metadata;
    assert_eq!(meta.strategy, FusionStrategy::Weighted);
    assert_eq!((meta.vector_weight, meta.text_weight), (0.5, 0.5));
    // the caller chose weighted; nothing was downgraded
    assert!(!meta.rrf_downgraded);
    Ok(())
}

#[tokio::test]
async fn test_limit_caps_results() -> Result<()> {
    let index = MockIndex::new(vec![
        passage("p1", 0.9, "a"),
        passage("p2", 0.8, "b"),
        passage("p3", 0.7, "c"),
    ]);
    let search = engine(
        index,
        SimpleVariants::new(),
        neutral_quality(HybridConfig::default()),
    );

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Quantencomputer",
            None,
            &HybridSearchOptions::new().with_limit(2),
        )
        .await?;

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].id.to_string(), "p1");
    Ok(())
}

#[tokio::test]
async fn test_index_failure_wrapped_once() {
    let search = engine(
        MockIndex::failing(),
        SimpleVariants::new(),
        HybridConfig::default(),
    );

    let err = search
        .search(
            "passages",
            vec![1.0],
            "Klimaschutz",
            None,
            &HybridSearchOptions::new(),
        )
        .await
        .unwrap_err();

    match err {
        SearchError::HybridSearchFailed(msg) => {
            assert!(msg.contains("index connection refused"), "got: {msg}");
        }
        other => panic!("expected HybridSearchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_index_is_success_not_failure() -> Result<()> {
    let search = engine(
        MockIndex::new(Vec::new()),
        SimpleVariants::new(),
        HybridConfig::default(),
    );

    let response = search
        .search(
            "passages",
            vec![1.0],
            "Klimaschutz",
            None,
            &HybridSearchOptions::new(),
        )
        .await?;

    assert!(response.results.is_empty());
    assert_eq!(response.metadata.vector_count, 0);
    assert_eq!(response.metadata.text_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_exposed_vector_search_is_quality_aware() -> Result<()> {
    // rate the similarity leader poorly so quality rescoring flips the order
    let index = MockIndex::new(vec![
        {
            let mut p = passage("high", 0.8, "a");
            p.payload.quality_score = Some(1.0);
            p
        },
        {
            let mut p = passage("low", 0.9, "b");
            p.payload.quality_score = Some(0.0);
            p
        },
    ]);
    let config = HybridConfig::default().with_quality_boost(2.0);
    let search = engine(index, SimpleVariants::new(), config);

    let hits = search
        .vector_search("passages", vec![1.0], None, &VectorSearchOptions::new())
        .await?;

    assert_eq!(hits[0].id.to_string(), "high");
    assert!(hits[0].score > hits[1].score);
    Ok(())
}
