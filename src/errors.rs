//! Structured error types for the memory engine
//!
//! Stable machine-readable codes for embedding callers; collaborator
//! failures wrap the opaque error from the external service.

use thiserror::Error;

/// Engine error taxonomy
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Unit, entity, or document id absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Empty query, unsupported fact type, negative budget, dimension
    /// mismatch, and similar caller mistakes
    #[error("invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Embedding collaborator failed after bounded retries
    #[error("embedder unavailable: {0}")]
    EmbeddingUnavailable(#[source] anyhow::Error),

    /// Reranker failed; retrieval degrades to fused order (surfaced in the
    /// search trace, not to the caller)
    #[error("reranker degraded: {0}")]
    RerankerDegraded(#[source] anyhow::Error),

    /// Fact extractor failed for the whole ingest call
    #[error("fact extractor unavailable: {0}")]
    ExtractorUnavailable(#[source] anyhow::Error),

    /// Temporal parser failed; the temporal path is skipped
    #[error("temporal parser unavailable: {0}")]
    TemporalParserUnavailable(#[source] anyhow::Error),

    /// Persistence layer unreachable; callers must retry
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Per-query deadline expired; partial results may still be returned
    #[error("deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    /// Duplicate insertion by id (distinct from dedupe, which is a silent
    /// skip)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl MemoryError {
    /// Stable machine-readable code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            Self::RerankerDegraded(_) => "RERANKER_DEGRADED",
            Self::ExtractorUnavailable(_) => "EXTRACTOR_UNAVAILABLE",
            Self::TemporalParserUnavailable(_) => "TEMPORAL_PARSER_UNAVAILABLE",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Self::Conflict(_) => "CONFLICT",
        }
    }

    /// Whether a retry of the same call can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_)
                | Self::EmbeddingUnavailable(_)
                | Self::DeadlineExceeded { .. }
        )
    }

    pub(crate) fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rocksdb::Error> for MemoryError {
    fn from(err: rocksdb::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<tantivy::TantivyError> for MemoryError {
    fn from(err: tantivy::TantivyError) -> Self {
        Self::StoreUnavailable(format!("fulltext index: {err}"))
    }
}

impl From<bincode::Error> for MemoryError {
    fn from(err: bincode::Error) -> Self {
        Self::StoreUnavailable(format!("record codec: {err}"))
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Type alias for Results using MemoryError
pub type Result<T> = std::result::Result<T, MemoryError>;
