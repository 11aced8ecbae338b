//! Capability traits for the external collaborators
//!
//! The fact-extraction LLM, the embedding model, the cross-encoder
//! reranker, and the temporal parser are opaque services. Each sits behind
//! a trait so it can be stubbed in tests and swapped at runtime. Their
//! calls are suspension points: remote or model-bound.
//!
//! Boundary errors are `anyhow::Error`; the engine maps them into the
//! crate's error taxonomy (`EmbeddingUnavailable`, `ExtractorUnavailable`,
//! `RerankerDegraded`, `TemporalParserUnavailable`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{EntityKind, FactType};

/// An entity mention reported by the extractor within one fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionSpan {
    /// Surface form as it appears in the fact text
    pub surface: String,
    pub kind: EntityKind,
}

/// One narrative fact produced by the extractor
///
/// Text is expected to be self-contained: coreferences resolved,
/// participants and reasoning preserved.
#[derive(Debug, Clone)]
pub struct ExtractedFact {
    pub text: String,
    pub fact_type: FactType,
    pub mentions: Vec<MentionSpan>,
}

/// Fact-extraction LLM: content in, narrative facts with entity mentions out
#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, content: &str) -> anyhow::Result<Vec<ExtractedFact>>;
}

/// Embedding model producing fixed-dimension L2-normalized vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for text
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embedding dimension this model produces
    fn dimension(&self) -> usize;

    /// Batch embed multiple texts
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Cross-encoder scoring query/document pairs
///
/// Returns one raw (uncalibrated) score per document, in input order.
/// Batching is the implementation's concern.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score(&self, query: &str, documents: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Temporal parser mapping a query to an optional date range
#[async_trait]
pub trait TemporalParser: Send + Sync {
    /// Returns `Some((start, end))` when the query carries a temporal
    /// constraint ("last spring", "in April 2023"), `None` otherwise.
    /// `reference` anchors relative expressions.
    async fn parse_range(
        &self,
        query: &str,
        reference: DateTime<Utc>,
    ) -> anyhow::Result<Option<(DateTime<Utc>, DateTime<Utc>)>>;
}
