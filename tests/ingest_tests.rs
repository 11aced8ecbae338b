//! Ingestion tests
//!
//! Write-path behavior: dedupe, per-fact resilience, mention recording,
//! entity-link completeness, collaborator failure handling.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use engram_memory::ingest::FactOutcome;
use engram_memory::types::{EntityKind, FactType, LinkType};
use engram_memory::Collaborators;

use common::{
    engine_with, fact, stub_engine, FailingEmbedder, FailingExtractor, StubEmbedder,
    StubExtractor, StubReranker, StubTemporalParser, TEST_DIMENSION,
};

fn date(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_ingest_inserts_extracted_facts() {
    let (engine, _dir) = stub_engine();

    let report = engine
        .ingest(
            "a1",
            "Alice joined the robotics team.\nThe lab moved to building seven.",
            date(2024, 3, 1),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.inserted_ids().len(), 2);
    assert_eq!(report.failed_count(), 0);

    let id = report.inserted_ids()[0];
    let unit = engine.get_unit(&id).unwrap();
    assert_eq!(unit.agent_id, "a1");
    assert_eq!(unit.fact_type, FactType::World);
}

#[tokio::test]
async fn test_identical_text_dedupes_to_one_unit() {
    let (engine, _dir) = stub_engine();
    let content = "The reactor passed its safety inspection.";

    let first = engine
        .ingest("a1", content, date(2024, 3, 1), None)
        .await
        .unwrap();
    let second = engine
        .ingest("a1", content, date(2024, 3, 1), None)
        .await
        .unwrap();

    let first_id = first.inserted_ids()[0];
    assert!(first.inserted_ids().len() == 1);
    assert!(second.inserted_ids().is_empty());
    match &second.outcomes[0] {
        FactOutcome::Deduplicated(id) => assert_eq!(*id, first_id),
        other => panic!("expected dedupe, got {other:?}"),
    }

    // Exactly one unit exists for the agent
    let all = engine
        .store()
        .units_in_range("a1", date(2000, 1, 1), date(2100, 1, 1))
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_same_text_different_agents_do_not_dedupe() {
    let (engine, _dir) = stub_engine();
    let content = "The reactor passed its safety inspection.";

    let a = engine
        .ingest("a1", content, date(2024, 3, 1), None)
        .await
        .unwrap();
    let b = engine
        .ingest("a2", content, date(2024, 3, 1), None)
        .await
        .unwrap();

    assert_eq!(a.inserted_ids().len(), 1);
    assert_eq!(b.inserted_ids().len(), 1);
}

#[tokio::test]
async fn test_per_fact_resilience() {
    let extractor = StubExtractor::new().with(
        "mixed batch",
        vec![
            fact("A valid narrative fact.", FactType::World, &[]),
            fact("", FactType::World, &[]),
            fact("Another valid fact survives.", FactType::World, &[]),
        ],
    );
    let collaborators = Collaborators {
        extractor: Arc::new(extractor),
        embedder: Arc::new(StubEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(StubTemporalParser::new()),
    };
    let (engine, _dir) = engine_with(collaborators);

    let report = engine
        .ingest("a1", "mixed batch", date(2024, 3, 1), None)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.inserted_ids().len(), 2);
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn test_extractor_failure_is_an_error() {
    let collaborators = Collaborators {
        extractor: Arc::new(FailingExtractor),
        embedder: Arc::new(StubEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(StubTemporalParser::new()),
    };
    let (engine, _dir) = engine_with(collaborators);

    let err = engine
        .ingest("a1", "anything", date(2024, 3, 1), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EXTRACTOR_UNAVAILABLE");
}

#[tokio::test]
async fn test_embedder_failure_fails_facts_not_call() {
    let collaborators = Collaborators {
        extractor: Arc::new(StubExtractor::new()),
        embedder: Arc::new(FailingEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(StubTemporalParser::new()),
    };
    let (engine, _dir) = engine_with(collaborators);

    let report = engine
        .ingest("a1", "one fact\nanother fact", date(2024, 3, 1), None)
        .await
        .unwrap();

    assert_eq!(report.failed_count(), 2);
    for outcome in &report.outcomes {
        match outcome {
            FactOutcome::Failed { error, .. } => {
                assert_eq!(error.code(), "EMBEDDING_UNAVAILABLE")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_empty_content_rejected() {
    let (engine, _dir) = stub_engine();
    let err = engine
        .ingest("a1", "   ", date(2024, 3, 1), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[tokio::test]
async fn test_mentions_recorded_and_entity_links_complete() {
    let extractor = StubExtractor::new()
        .with(
            "first",
            vec![fact(
                "Mars rover sent new telemetry.",
                FactType::World,
                &[("Mars", EntityKind::Concept)],
            )],
        )
        .with(
            "second",
            vec![fact(
                "Mars dust storm delayed the mission.",
                FactType::World,
                &[("Mars", EntityKind::Concept)],
            )],
        )
        .with(
            "third",
            vec![fact(
                "Mars orbital window opens in July.",
                FactType::World,
                &[("Mars", EntityKind::Concept)],
            )],
        );
    let collaborators = Collaborators {
        extractor: Arc::new(extractor),
        embedder: Arc::new(StubEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(StubTemporalParser::new()),
    };
    let (engine, _dir) = engine_with(collaborators);

    // Spread dates beyond the temporal window so only entity links connect
    engine.ingest("a1", "first", date(2024, 1, 1), None).await.unwrap();
    engine.ingest("a1", "second", date(2024, 2, 1), None).await.unwrap();
    engine.ingest("a1", "third", date(2024, 3, 1), None).await.unwrap();

    let store = engine.store();
    let unit_ids: Vec<_> = store
        .units_in_range("a1", date(2000, 1, 1), date(2100, 1, 1))
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(unit_ids.len(), 3);

    // All three units resolve to the same entity
    let entities = store.entities_for_unit(&unit_ids[0]).unwrap();
    assert_eq!(entities.len(), 1);
    let mars = entities[0];
    let mars_units = store.units_for_entity(&mars).unwrap();
    assert_eq!(mars_units.len(), 3);

    // The induced entity-link subgraph is complete: every pair connected
    for unit in &mars_units {
        let entity_neighbors: Vec<_> = store
            .neighbors(unit, 0.0)
            .unwrap()
            .into_iter()
            .filter(|l| l.link_type == LinkType::Entity)
            .map(|l| l.to)
            .collect();
        assert_eq!(entity_neighbors.len(), 2, "unit {unit} not fully connected");
    }
}

#[tokio::test]
async fn test_link_weight_invariants() {
    let (engine, _dir) = stub_engine();

    // Same-day facts produce temporal links; similar texts semantic links
    engine
        .ingest(
            "a1",
            "Solar Array Alpha North reported overload.\nSolar Array Alpha South remained nominal.\nKitchen inventory was restocked.",
            date(2024, 6, 1),
            None,
        )
        .await
        .unwrap();

    let store = engine.store();
    let units = store
        .units_in_range("a1", date(2000, 1, 1), date(2100, 1, 1))
        .unwrap();
    assert!(!units.is_empty());

    let mut saw_temporal = false;
    for (id, _) in &units {
        for link in store.neighbors(id, 0.0).unwrap() {
            assert!((0.0..=1.0).contains(&link.weight), "weight out of range");
            match link.link_type {
                LinkType::Temporal => {
                    saw_temporal = true;
                    assert!(link.weight >= 0.3, "temporal weight below floor");
                }
                LinkType::Entity => {
                    assert!((link.weight - 1.0).abs() < f32::EPSILON)
                }
                LinkType::Semantic => {}
            }
        }
    }
    assert!(saw_temporal, "same-day facts should be temporally linked");
}
