//! Temporal retrieval tests
//!
//! The temporal path activates only on a parsed date range, never leaks
//! out-of-range units, and an empty range never aborts fusion.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use engram_memory::retrieval::{PathKind, SearchOptions};
use engram_memory::Collaborators;

use common::{
    engine_with, stub_engine, StubEmbedder, StubExtractor, StubReranker, StubTemporalParser,
    TEST_DIMENSION,
};

fn date(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_out_of_range_history_stays_out() {
    // Range resolving to spring 2024; all units predate it
    let parser = StubTemporalParser::new().with(
        "What happened last spring?",
        date(2024, 3, 1),
        date(2024, 5, 31),
    );
    let collaborators = Collaborators {
        extractor: Arc::new(StubExtractor::new()),
        embedder: Arc::new(StubEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(parser),
    };
    let (engine, _dir) = engine_with(collaborators);

    engine
        .ingest("a1", "Team planted tomato seedlings.", date(2023, 4, 10), None)
        .await
        .unwrap();
    engine
        .ingest("a1", "Greenhouse irrigation line repaired.", date(2023, 4, 11), None)
        .await
        .unwrap();
    engine
        .ingest("a1", "Annual budget review concluded.", date(2024, 1, 1), None)
        .await
        .unwrap();

    let options = SearchOptions {
        enable_trace: true,
        ..Default::default()
    };
    let response = engine
        .search("a1", "What happened last spring?", &options)
        .await
        .unwrap();

    // Nothing matches the range or the words; the answer is empty, not an
    // error
    assert!(response.results.is_empty());

    let trace = response.trace.unwrap();
    let temporal_count = trace
        .path_counts
        .iter()
        .find(|(path, _)| *path == PathKind::TemporalGraph)
        .map(|(_, count)| *count)
        .unwrap();
    assert_eq!(temporal_count, 0, "temporal path must come back empty");
}

#[tokio::test]
async fn test_range_scopes_temporal_path_to_matching_period() {
    let parser = StubTemporalParser::new().with(
        "Harvest work in April?",
        date(2023, 4, 1),
        date(2023, 4, 30),
    );
    let collaborators = Collaborators {
        extractor: Arc::new(StubExtractor::new()),
        embedder: Arc::new(StubEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(parser),
    };
    let (engine, _dir) = engine_with(collaborators);

    engine
        .ingest("a1", "Harvest crew bundled the April wheat.", date(2023, 4, 10), None)
        .await
        .unwrap();
    engine
        .ingest("a1", "Harvest crew repaired the winter barn.", date(2023, 12, 20), None)
        .await
        .unwrap();

    let options = SearchOptions {
        enable_trace: true,
        ..Default::default()
    };
    let response = engine
        .search("a1", "Harvest work in April?", &options)
        .await
        .unwrap();

    let trace = response.trace.unwrap();
    let temporal_entries: Vec<_> = trace
        .entry_points
        .iter()
        .filter(|e| e.path == PathKind::TemporalGraph)
        .collect();
    assert_eq!(temporal_entries.len(), 1, "only the in-range unit enters");

    let in_range = response
        .results
        .iter()
        .find(|r| r.unit.text.contains("April wheat"))
        .expect("in-range unit retrieved");
    assert_eq!(temporal_entries[0].unit_id, in_range.unit.id);
}

#[tokio::test]
async fn test_no_range_means_no_temporal_path() {
    let (engine, _dir) = stub_engine();
    engine
        .ingest("a1", "Observatory dome resealed.", date(2024, 2, 2), None)
        .await
        .unwrap();

    let options = SearchOptions {
        enable_trace: true,
        ..Default::default()
    };
    let response = engine
        .search("a1", "Observatory dome", &options)
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    let trace = response.trace.unwrap();
    assert!(trace
        .entry_points
        .iter()
        .all(|e| e.path != PathKind::TemporalGraph));
}
