//! Documented constants for the memory engine
//!
//! This module contains all tunable parameters with justification for their
//! values. Centralizing constants prevents magic numbers and makes tuning
//! easier.

// =============================================================================
// LINK CONSTRUCTION CONSTANTS
// =============================================================================

/// Temporal link window in hours
///
/// Units whose event dates fall within this window of a newly inserted unit
/// receive a temporal link.
///
/// Justification:
/// - 24 hours groups facts from the same conversation day
/// - Matches the indexed event_date range scan used to bound candidates
pub const TEMPORAL_LINK_WINDOW_HOURS: i64 = 24;

/// Minimum temporal link weight
///
/// Temporal weights follow max(0.3, 1 - |dt| / window), so even units at the
/// window edge keep a traversable connection.
pub const TEMPORAL_LINK_MIN_WEIGHT: f32 = 0.3;

/// Maximum temporal neighbors linked per side of the window
///
/// Bounds dense days: without a cap, a burst of same-day ingestion creates a
/// quadratic clique of temporal links.
pub const TEMPORAL_LINK_MAX_NEIGHBORS: usize = 10;

/// Number of semantic link candidates probed per inserted unit (K_sem)
pub const SEMANTIC_LINK_K: usize = 20;

/// Minimum similarity for a semantic link (theta_sem)
///
/// Justification:
/// - 0.7 cosine similarity indicates genuinely related narrative facts
/// - Below this, links add traversal noise faster than recall
pub const SEMANTIC_LINK_THRESHOLD: f32 = 0.7;

/// Entity links carry full weight: sharing a resolved entity is a hard
/// association, not a scored one.
pub const ENTITY_LINK_WEIGHT: f32 = 1.0;

// =============================================================================
// INGESTION CONSTANTS
// =============================================================================

/// Similarity threshold for the dedupe probe
///
/// A new fact whose embedding matches an existing unit at or above this
/// similarity (or whose text hash matches exactly) is silently skipped.
///
/// Justification:
/// - 0.95 tolerates trivial rephrasings the extractor produces on re-ingest
/// - Exact-text hashing catches duplicates even when the embedder drifts
pub const DEDUPE_SIMILARITY_THRESHOLD: f32 = 0.95;

/// Embedding attempts per fact before surfacing EmbeddingUnavailable
pub const EMBED_MAX_ATTEMPTS: u32 = 3;

/// Base backoff between embedding retries in milliseconds
///
/// Doubles per attempt: 100ms, 200ms. Bounded so a dead embedder fails a
/// fact in well under a second instead of stalling the batch.
pub const EMBED_RETRY_BACKOFF_MS: u64 = 100;

// =============================================================================
// RETRIEVAL PATH CONSTANTS
// =============================================================================

/// Default candidate bound per retrieval path and graph visit budget
pub const DEFAULT_THINKING_BUDGET: usize = 100;

/// Default BPE-token ceiling on returned text content
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Minimum similarity for the semantic retrieval path
///
/// Low on purpose: the semantic path feeds rank fusion, which rewards
/// agreement across paths; hard filtering happens later at rerank.
pub const SEMANTIC_PATH_MIN_SIMILARITY: f32 = 0.3;

/// Spreading activation entry points: count and similarity floor
///
/// Justification:
/// - 5 entry points cover distinct query aspects without flooding the queue
/// - 0.5 keeps entries close enough that activation stays meaningful
pub const GRAPH_ENTRY_K: usize = 5;
pub const GRAPH_ENTRY_MIN_SIMILARITY: f32 = 0.5;

/// Per-hop activation decay for spreading activation
///
/// Propagation is a_m = a_n * w * decay. With typical link weights this
/// drops below the activation floor in 4-5 hops.
pub const GRAPH_DECAY: f32 = 0.8;

/// Activation floor: nodes below this are not enqueued
pub const GRAPH_ACTIVATION_FLOOR: f32 = 0.1;

/// Link weight floor: links below this are not traversed
pub const GRAPH_LINK_WEIGHT_FLOOR: f32 = 0.1;

/// Temporal path: minimum semantic similarity for an in-range node
///
/// Time-only filtering leaks across subjects; semantic co-filtering is
/// mandatory on this path.
pub const TEMPORAL_PATH_MIN_SIMILARITY: f32 = 0.4;

/// Temporal path per-hop decay (more aggressive than the graph path: the
/// range already bounds the neighborhood)
pub const TEMPORAL_PATH_DECAY: f32 = 0.7;

/// Weight of semantic similarity in a temporal entry point's initial
/// activation (activation = temporal_proximity + bonus * similarity)
pub const TEMPORAL_SEMANTIC_BONUS: f32 = 0.5;

// =============================================================================
// FUSION AND RERANKING CONSTANTS
// =============================================================================

/// RRF constant k
///
/// RRF(d) = sum over lists of 1 / (k + rank). 60 is the standard from the
/// original RRF paper; higher values flatten the contribution curve.
pub const RRF_K: f32 = 60.0;

/// Tokenizer identifier for the budget filter
///
/// GPT-4 BPE-compatible vocabulary. Token counts returned to callers are
/// exact for this encoding, not estimates.
pub const BUDGET_TOKENIZER: &str = "cl100k_base";

// =============================================================================
// RANKING WEIGHT DEFAULTS
// =============================================================================

/// Default weights for the optional linearly-combined final score:
/// final = w_a * activation + w_s * semantic + w_r * recency + w_f * frequency
///
/// Recency uses a one-year logarithmic half-life; frequency saturates at 10
/// accesses. Weights must sum to 1.
pub const RANKING_WEIGHT_ACTIVATION: f32 = 0.30;
pub const RANKING_WEIGHT_SEMANTIC: f32 = 0.30;
pub const RANKING_WEIGHT_RECENCY: f32 = 0.25;
pub const RANKING_WEIGHT_FREQUENCY: f32 = 0.15;

/// Days in the recency half-life denominator
pub const RANKING_RECENCY_SCALE_DAYS: f64 = 365.0;

// =============================================================================
// ENTITY RESOLUTION CONSTANTS
// =============================================================================

/// Signal weights for candidate scoring:
/// s = 0.5 * name_similarity + 0.3 * co_occurrence + 0.2 * temporal_proximity
pub const RESOLVER_WEIGHT_NAME: f32 = 0.5;
pub const RESOLVER_WEIGHT_COOCCURRENCE: f32 = 0.3;
pub const RESOLVER_WEIGHT_TEMPORAL: f32 = 0.2;

/// Days over which temporal proximity decays to zero
///
/// An entity last seen 180+ days ago contributes nothing on the temporal
/// signal; re-mentions of dormant names must win on name and co-occurrence.
pub const RESOLVER_TEMPORAL_SCALE_DAYS: f64 = 180.0;

/// Acceptance threshold for a scored candidate
pub const RESOLVER_ACCEPT_THRESHOLD: f32 = 0.6;

/// Relaxed threshold for exact-name PERSON matches
///
/// People are re-mentioned by exact name across long gaps; an exact alias
/// match on a PERSON accepts at a lower combined score.
pub const RESOLVER_PERSON_EXACT_THRESHOLD: f32 = 0.4;

/// Ambiguity margin: top-two candidates within this score gap resolve
/// deterministically to the earlier first_seen.
pub const RESOLVER_AMBIGUITY_MARGIN: f32 = 0.02;

// =============================================================================
// STORE AND INDEX CONSTANTS
// =============================================================================

/// Fixed embedding dimension
///
/// Set at ingestion time and immutable; vectors of any other length are
/// rejected with InvalidInput.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Vector index: below this many live vectors, search is an exact scan
///
/// Exactness matters for the dedupe probe and for small agents; the graph
/// index only pays off past a few thousand vectors.
pub const VECTOR_BRUTE_FORCE_THRESHOLD: usize = 1024;

/// Vector index: maximum graph degree (R)
pub const VECTOR_MAX_DEGREE: usize = 32;

/// Vector index: beam width during greedy search and construction (L)
pub const VECTOR_SEARCH_LIST_SIZE: usize = 75;

/// Vector index: alpha for RNG-style pruning
pub const VECTOR_PRUNE_ALPHA: f32 = 1.2;

/// Over-fetch multiplier when a fact_type filter rejects candidates
///
/// When searching for N filtered results we probe N * this many candidates
/// then filter down.
pub const VECTOR_FILTER_OVERFETCH: usize = 2;

/// BM25 writer heap in bytes (tantivy requires >= 3MB per thread)
pub const BM25_WRITER_HEAP: usize = 50_000_000;
