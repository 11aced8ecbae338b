#![allow(dead_code)]

//! Shared test support: deterministic stub collaborators
//!
//! The stubs keep every external service local and repeatable:
//! - `StubEmbedder`: bag-of-words vectors with per-token dimensions handed
//!   out on first sight, so cosine similarities are exact set overlaps
//! - `StubExtractor`: scripted content -> facts mapping with a whole-text
//!   fallback
//! - `StubReranker`: token-overlap scoring; `FailingReranker` for
//!   degradation tests
//! - `StubTemporalParser`: scripted query -> range mapping

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;

use engram_memory::providers::{
    Embedder, ExtractedFact, FactExtractor, MentionSpan, Reranker, TemporalParser,
};
use engram_memory::types::{EntityKind, FactType};
use engram_memory::{Collaborators, EngineConfig, MemoryEngine};

/// Words carrying no signal in the stub vector space
const STUB_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "by", "did", "do", "does", "for", "from", "happened", "her", "his",
    "in", "is", "it", "last", "of", "on", "the", "to", "was", "what", "when", "where", "who",
    "with",
];

/// Weight for capitalized (entity-like) tokens vs ordinary words
const ENTITY_TOKEN_WEIGHT: f32 = 4.0;
const PLAIN_TOKEN_WEIGHT: f32 = 1.0;

/// Deterministic bag-of-words embedder
///
/// Each distinct token gets its own dimension on first sight, so two texts'
/// cosine similarity is exactly their weighted token overlap. The
/// `[Date: ...]` augmentation prefix is stripped: the stub models a content
/// encoder, and tests control date effects through the reranker instead.
pub struct StubEmbedder {
    dimension: usize,
    slots: Mutex<HashMap<String, usize>>,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn tokens(text: &str) -> Vec<(String, f32)> {
        let body = match text.strip_prefix("[Date:") {
            Some(rest) => rest.split_once(']').map(|(_, b)| b).unwrap_or(rest),
            None => text,
        };

        body.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .filter_map(|raw| {
                let lower = raw.to_lowercase();
                if STUB_STOP_WORDS.contains(&lower.as_str()) {
                    return None;
                }
                let weight = if raw.chars().next().is_some_and(|c| c.is_uppercase()) {
                    ENTITY_TOKEN_WEIGHT
                } else {
                    PLAIN_TOKEN_WEIGHT
                };
                Some((lower, weight))
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut slots = self.slots.lock();
        for (token, weight) in Self::tokens(text) {
            let next = slots.len();
            let slot = *slots.entry(token).or_insert(next);
            anyhow::ensure!(slot < self.dimension, "stub embedder out of dimensions");
            vector[slot] += weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that always fails; for degradation tests
pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("embedding service down")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Scripted fact extractor with a whole-content fallback
#[derive(Default)]
pub struct StubExtractor {
    scripted: Mutex<HashMap<String, Vec<ExtractedFact>>>,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the facts returned for an exact content string
    pub fn with(self, content: &str, facts: Vec<ExtractedFact>) -> Self {
        self.scripted.lock().insert(content.to_string(), facts);
        self
    }
}

#[async_trait]
impl FactExtractor for StubExtractor {
    async fn extract(&self, content: &str) -> anyhow::Result<Vec<ExtractedFact>> {
        if let Some(facts) = self.scripted.lock().get(content) {
            return Ok(facts.clone());
        }
        // Fallback: one world fact per line, no mentions
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| ExtractedFact {
                text: line.trim().to_string(),
                fact_type: FactType::World,
                mentions: Vec::new(),
            })
            .collect())
    }
}

/// Extractor that always fails
pub struct FailingExtractor;

#[async_trait]
impl FactExtractor for FailingExtractor {
    async fn extract(&self, _content: &str) -> anyhow::Result<Vec<ExtractedFact>> {
        anyhow::bail!("extractor model unavailable")
    }
}

/// Token-overlap reranker: raw score = |query tokens ∩ doc tokens| scaled
pub struct StubReranker;

#[async_trait]
impl Reranker for StubReranker {
    async fn score(&self, query: &str, documents: &[String]) -> anyhow::Result<Vec<f32>> {
        let query_tokens: Vec<String> = tokenize(query);
        Ok(documents
            .iter()
            .map(|doc| {
                let doc_tokens = tokenize(doc);
                let overlap = query_tokens
                    .iter()
                    .filter(|t| doc_tokens.contains(t))
                    .count();
                overlap as f32 - 1.0
            })
            .collect())
    }
}

/// Reranker that always fails; retrieval must degrade to fused order
pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn score(&self, _query: &str, _documents: &[String]) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("cross-encoder unavailable")
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scripted temporal parser; unscripted queries carry no range
#[derive(Default)]
pub struct StubTemporalParser {
    ranges: Mutex<HashMap<String, (DateTime<Utc>, DateTime<Utc>)>>,
}

impl StubTemporalParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, query: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.ranges.lock().insert(query.to_string(), (start, end));
        self
    }
}

#[async_trait]
impl TemporalParser for StubTemporalParser {
    async fn parse_range(
        &self,
        query: &str,
        _reference: DateTime<Utc>,
    ) -> anyhow::Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        Ok(self.ranges.lock().get(query).copied())
    }
}

/// Test embedding dimension: generous enough that no test runs out of
/// token slots
pub const TEST_DIMENSION: usize = 384;

/// Engine config for tests
pub fn test_config() -> EngineConfig {
    EngineConfig {
        embedding_dimension: TEST_DIMENSION,
        ..Default::default()
    }
}

/// Default collaborator set for tests
pub fn stub_collaborators() -> Collaborators {
    Collaborators {
        extractor: Arc::new(StubExtractor::new()),
        embedder: Arc::new(StubEmbedder::new(TEST_DIMENSION)),
        reranker: Arc::new(StubReranker),
        temporal_parser: Arc::new(StubTemporalParser::new()),
    }
}

/// Engine with stub collaborators in a temp directory
pub fn stub_engine() -> (MemoryEngine, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let engine = MemoryEngine::new(dir.path(), test_config(), stub_collaborators())
        .expect("engine");
    (engine, dir)
}

/// Engine with custom collaborators in a temp directory
pub fn engine_with(collaborators: Collaborators) -> (MemoryEngine, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let engine =
        MemoryEngine::new(dir.path(), test_config(), collaborators).expect("engine");
    (engine, dir)
}

/// Shorthand for an extracted fact
pub fn fact(text: &str, fact_type: FactType, mentions: &[(&str, EntityKind)]) -> ExtractedFact {
    ExtractedFact {
        text: text.to_string(),
        fact_type,
        mentions: mentions
            .iter()
            .map(|(surface, kind)| MentionSpan {
                surface: surface.to_string(),
                kind: *kind,
            })
            .collect(),
    }
}
