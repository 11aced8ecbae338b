//! Search trace: what each retrieval path did and why
//!
//! Built only when a caller asks for it. The trace carries enough to
//! explain a result set: per-path entry points with similarities, the
//! ordered node visits of the graph traversals, every pruning decision
//! with its reason, degradation tags, and per-stage durations.

use serde::{Deserialize, Serialize};

use crate::types::{LinkType, UnitId};

/// Which retrieval path produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Semantic,
    Keyword,
    Graph,
    TemporalGraph,
}

/// A traversal entry point with its query similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    pub path: PathKind,
    pub unit_id: UnitId,
    pub similarity: f32,
}

/// One node visit during spreading activation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeVisit {
    pub node_id: UnitId,
    /// Visit order within the traversal, starting at 0
    pub step: usize,
    pub parent_id: Option<UnitId>,
    pub link_type: Option<LinkType>,
    pub link_weight: Option<f32>,
    pub activation: f32,
    pub semantic_similarity: f32,
    pub final_weight: f32,
    /// Position in the path's ranked output, filled after ranking
    pub rank: Option<usize>,
}

/// Why a node or edge was not pursued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneReason {
    AlreadyVisited,
    BelowActivationFloor,
    BudgetExhausted,
    LinkWeightBelowThreshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneRecord {
    pub node_id: UnitId,
    pub reason: PruneReason,
}

/// Degraded-but-not-failed conditions surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum Degradation {
    /// Reranker unavailable; results follow fused order
    RerankerDegraded,
    /// Temporal parser unavailable; the temporal path was skipped
    TemporalParserUnavailable,
    /// A path hit the per-query deadline and returned partial results
    DeadlineExceeded(PathKind),
    /// A path failed outright and contributed an empty list
    PathUnavailable(PathKind, String),
}

/// Wall-clock milliseconds per pipeline stage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageDurations {
    pub embed_ms: u64,
    pub paths_ms: u64,
    pub fusion_ms: u64,
    pub rerank_ms: u64,
    pub budget_ms: u64,
    pub total_ms: u64,
}

/// Full account of one retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTrace {
    /// Query echo
    pub query: String,
    pub entry_points: Vec<EntryPoint>,
    pub visits: Vec<NodeVisit>,
    pub prunes: Vec<PruneRecord>,
    pub degradations: Vec<Degradation>,
    /// Result-list length per path before fusion
    pub path_counts: Vec<(PathKind, usize)>,
    pub durations: StageDurations,
}

impl SearchTrace {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            entry_points: Vec::new(),
            visits: Vec::new(),
            prunes: Vec::new(),
            degradations: Vec::new(),
            path_counts: Vec::new(),
            durations: StageDurations::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Pretty JSON dump for logs and debugging sessions
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
