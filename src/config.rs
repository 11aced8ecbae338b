//! Configuration for the memory engine
//!
//! All tunables in one place with sensible defaults. Configuration is
//! programmatic: construct an [`EngineConfig`], adjust fields, pass it to
//! the engine. Environment variables and CLI flags are deliberately not
//! part of this crate's contract.

use tracing::info;

use crate::constants::{
    DEDUPE_SIMILARITY_THRESHOLD, DEFAULT_MAX_TOKENS, DEFAULT_THINKING_BUDGET, EMBEDDING_DIMENSION,
    RANKING_WEIGHT_ACTIVATION, RANKING_WEIGHT_FREQUENCY, RANKING_WEIGHT_RECENCY,
    RANKING_WEIGHT_SEMANTIC, SEMANTIC_LINK_K, SEMANTIC_LINK_THRESHOLD,
    TEMPORAL_LINK_WINDOW_HOURS,
};
use crate::errors::{MemoryError, Result};

/// Weights for the optional linearly-combined final score
///
/// final = w_activation * activation + w_semantic * semantic_similarity
///       + w_recency * recency + w_frequency * frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub activation: f32,
    pub semantic: f32,
    pub recency: f32,
    pub frequency: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            activation: RANKING_WEIGHT_ACTIVATION,
            semantic: RANKING_WEIGHT_SEMANTIC,
            recency: RANKING_WEIGHT_RECENCY,
            frequency: RANKING_WEIGHT_FREQUENCY,
        }
    }
}

impl RankingWeights {
    /// Weights must sum to 1 (within float tolerance) and be non-negative
    pub fn validate(&self) -> Result<()> {
        let parts = [self.activation, self.semantic, self.recency, self.frequency];
        if parts.iter().any(|w| *w < 0.0) {
            return Err(MemoryError::invalid_input(
                "ranking_weights",
                "weights must be non-negative",
            ));
        }
        let sum: f32 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-3 {
            return Err(MemoryError::invalid_input(
                "ranking_weights",
                format!("weights must sum to 1, got {sum:.4}"),
            ));
        }
        Ok(())
    }
}

/// Engine configuration with defaults for every tunable
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed embedding dimension; vectors of any other length are rejected
    pub embedding_dimension: usize,

    /// Identifier of the embedding model behind the Embedder collaborator
    /// (informational; carried into traces and logs)
    pub embedding_model: String,

    /// Identifier of the cross-encoder behind the Reranker collaborator
    pub reranker_model: String,

    /// Tokenizer used by the budget filter
    pub tokenizer: String,

    /// Default upper bound on candidates per retriever and on graph nodes
    /// visited
    pub default_thinking_budget: usize,

    /// Default BPE-token ceiling on returned text content
    pub default_max_tokens: usize,

    /// Temporal link window (hours)
    pub temporal_link_window_hours: i64,

    /// Semantic link candidate count (K_sem)
    pub semantic_link_k: usize,

    /// Semantic link similarity threshold (theta_sem)
    pub semantic_link_threshold: f32,

    /// Dedupe probe similarity threshold
    pub dedupe_threshold: f32,

    /// Weights for the optional combined final score
    pub ranking_weights: RankingWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: EMBEDDING_DIMENSION,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            reranker_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            tokenizer: crate::constants::BUDGET_TOKENIZER.to_string(),
            default_thinking_budget: DEFAULT_THINKING_BUDGET,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            temporal_link_window_hours: TEMPORAL_LINK_WINDOW_HOURS,
            semantic_link_k: SEMANTIC_LINK_K,
            semantic_link_threshold: SEMANTIC_LINK_THRESHOLD,
            dedupe_threshold: DEDUPE_SIMILARITY_THRESHOLD,
            ranking_weights: RankingWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimension == 0 {
            return Err(MemoryError::invalid_input(
                "embedding_dimension",
                "must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.semantic_link_threshold) {
            return Err(MemoryError::invalid_input(
                "semantic_link_threshold",
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.dedupe_threshold) {
            return Err(MemoryError::invalid_input(
                "dedupe_threshold",
                "must be within [0, 1]",
            ));
        }
        if self.temporal_link_window_hours <= 0 {
            return Err(MemoryError::invalid_input(
                "temporal_link_window_hours",
                "must be positive",
            ));
        }
        self.ranking_weights.validate()
    }

    /// Log the effective configuration at startup
    pub fn log(&self) {
        info!("Engine configuration:");
        info!("   Embedding: {} ({}d)", self.embedding_model, self.embedding_dimension);
        info!("   Reranker: {}", self.reranker_model);
        info!("   Tokenizer: {}", self.tokenizer);
        info!(
            "   Budgets: thinking={}, max_tokens={}",
            self.default_thinking_budget, self.default_max_tokens
        );
        info!(
            "   Links: window={}h, K_sem={}, theta_sem={:.2}, dedupe={:.2}",
            self.temporal_link_window_hours,
            self.semantic_link_k,
            self.semantic_link_threshold,
            self.dedupe_threshold
        );
    }
}
