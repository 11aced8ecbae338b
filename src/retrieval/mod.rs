//! Retrieval pipeline
//!
//! One query fans out to four paths in parallel: semantic kNN, BM25
//! keyword, spreading activation, and (when the temporal parser finds a
//! date range) time-filtered spreading activation. The ranked lists are
//! fused with reciprocal-rank fusion, the fused top slice goes through the
//! cross-encoder reranker, and the final order is cut to the caller's
//! token budget.
//!
//! Degradation over failure: an unreachable path contributes an empty
//! list, a failed reranker leaves the fused order standing, and a deadline
//! expiry returns whatever the paths had. Each of these is tagged in the
//! trace; only an unusable query embedding fails the whole search.

pub mod budget;
pub mod fusion;
pub mod graph;
pub mod keyword;
pub mod ranking;
pub mod rerank;
pub mod semantic;
pub mod temporal;
pub mod trace;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, RankingWeights};
use crate::errors::{MemoryError, Result};
use crate::providers::{Embedder, Reranker, TemporalParser};
use crate::store::{cosine_similarity, MemoryStore};
use crate::types::{FactType, MemoryUnit, UnitId};

use budget::TokenBudget;
use rerank::RerankClient;
pub use trace::{
    Degradation, EntryPoint, NodeVisit, PathKind, PruneReason, PruneRecord, SearchTrace,
    StageDurations,
};

/// Per-query knobs; every field has the spec default
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Restrict all paths to one fact type
    pub fact_type: Option<FactType>,

    /// Upper bound on candidates per path and graph nodes visited
    pub thinking_budget: usize,

    /// BPE-token ceiling on returned text
    pub max_tokens: usize,

    pub enable_trace: bool,

    /// Per-query deadline; expiry degrades instead of failing
    pub deadline: Option<std::time::Duration>,

    /// When set, each result also carries the linearly-combined
    /// final_weight under these weights
    pub ranking_weights: Option<RankingWeights>,

    /// Anchor for relative temporal expressions; defaults to now
    pub reference_date: Option<DateTime<Utc>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fact_type: None,
            thinking_budget: crate::constants::DEFAULT_THINKING_BUDGET,
            max_tokens: crate::constants::DEFAULT_MAX_TOKENS,
            enable_trace: false,
            deadline: None,
            ranking_weights: None,
            reference_date: None,
        }
    }
}

/// One retrieved unit with its full score breakdown
#[derive(Debug, Clone)]
pub struct ScoredUnit {
    pub unit: MemoryUnit,

    /// The ordering score: calibrated rerank score, or RRF when degraded
    pub score: f32,

    pub rrf_score: f32,
    pub rerank_score: Option<f32>,

    /// Spreading activation, when a graph path reached this unit
    pub activation: Option<f32>,

    pub semantic_similarity: f32,
    pub recency: f32,
    pub frequency: f32,

    /// Present when the caller supplied ranking weights
    pub final_weight: Option<f32>,

    /// Exact BPE tokens of `unit.text`
    pub token_count: usize,
}

#[derive(Debug)]
pub struct SearchResponse {
    pub results: Vec<ScoredUnit>,
    pub trace: Option<SearchTrace>,
}

pub struct Retriever {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn Embedder>,
    temporal_parser: Arc<dyn TemporalParser>,
    rerank_client: RerankClient,
    token_budget: TokenBudget,
    embedding_dimension: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<MemoryStore>,
        config: &EngineConfig,
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        temporal_parser: Arc<dyn TemporalParser>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            embedder,
            temporal_parser,
            rerank_client: RerankClient::new(reranker),
            token_budget: TokenBudget::new()?,
            embedding_dimension: config.embedding_dimension,
        })
    }

    /// Run the full retrieval pipeline for one query
    pub async fn search(
        &self,
        agent_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse> {
        if agent_id.is_empty() {
            return Err(MemoryError::invalid_input("agent_id", "must not be empty"));
        }
        if query.trim().is_empty() {
            return Err(MemoryError::invalid_input("query", "must not be empty"));
        }
        if let Some(weights) = &options.ranking_weights {
            weights.validate()?;
        }

        let mut trace = options.enable_trace.then(|| SearchTrace::new(query));

        // Zero budget answers immediately: no store reads, no model calls
        if options.thinking_budget == 0 {
            return Ok(SearchResponse {
                results: Vec::new(),
                trace,
            });
        }

        let started = Instant::now();
        let deadline = options.deadline.map(|d| started + d);
        let reference = options.reference_date.unwrap_or_else(Utc::now);

        // Stage 1: query embedding and temporal parse, in parallel
        let (embed_result, parse_result) = tokio::join!(
            self.embedder.embed(query),
            self.temporal_parser.parse_range(query, reference),
        );
        let query_vec = embed_result.map_err(MemoryError::EmbeddingUnavailable)?;
        if query_vec.len() != self.embedding_dimension {
            return Err(MemoryError::invalid_input(
                "query_vec",
                format!(
                    "dimension mismatch: expected {}, got {}",
                    self.embedding_dimension,
                    query_vec.len()
                ),
            ));
        }
        let range = match parse_result {
            Ok(range) => range,
            Err(err) => {
                warn!("temporal parser unavailable: {err}");
                if let Some(trace) = trace.as_mut() {
                    trace
                        .degradations
                        .push(Degradation::TemporalParserUnavailable);
                }
                None
            }
        };
        let embed_ms = started.elapsed().as_millis() as u64;

        // Stage 2: fan out the four paths
        let paths_started = Instant::now();
        let budget = options.thinking_budget;
        let fact_type = options.fact_type;
        let collect_trace = options.enable_trace;

        let (semantic_result, keyword_result, graph_result, temporal_result) = tokio::join!(
            async { semantic::query(&self.store, agent_id, fact_type, &query_vec, budget) },
            async { keyword::query(&self.store, agent_id, fact_type, query, budget) },
            async {
                graph::spreading_activation(
                    &self.store,
                    agent_id,
                    fact_type,
                    &query_vec,
                    budget,
                    deadline,
                    collect_trace,
                )
            },
            async {
                match range {
                    Some(range) => temporal::temporal_spreading(
                        &self.store,
                        agent_id,
                        fact_type,
                        &query_vec,
                        range,
                        budget,
                        deadline,
                        collect_trace,
                    )
                    .map(Some),
                    None => Ok(None),
                }
            },
        );

        let mut degradations: Vec<Degradation> = Vec::new();
        let semantic_list = unwrap_path(semantic_result, PathKind::Semantic, &mut degradations);
        let keyword_list = unwrap_path(keyword_result, PathKind::Keyword, &mut degradations);

        let graph_traversal = match graph_result {
            Ok(traversal) => traversal,
            Err(err) => {
                degradations.push(Degradation::PathUnavailable(
                    PathKind::Graph,
                    err.to_string(),
                ));
                graph::Traversal::default()
            }
        };
        if graph_traversal.deadline_hit {
            degradations.push(Degradation::DeadlineExceeded(PathKind::Graph));
        }

        let temporal_traversal = match temporal_result {
            Ok(traversal) => traversal,
            Err(err) => {
                degradations.push(Degradation::PathUnavailable(
                    PathKind::TemporalGraph,
                    err.to_string(),
                ));
                None
            }
        };
        if temporal_traversal
            .as_ref()
            .is_some_and(|t| t.deadline_hit)
        {
            degradations.push(Degradation::DeadlineExceeded(PathKind::TemporalGraph));
        }

        let paths_ms = paths_started.elapsed().as_millis() as u64;

        // Stage 3: reciprocal-rank fusion
        let fusion_started = Instant::now();
        let mut lists: Vec<Vec<(UnitId, f32)>> = vec![
            semantic_list.clone(),
            keyword_list.clone(),
            graph_traversal.ranked.clone(),
        ];
        if let Some(temporal) = &temporal_traversal {
            lists.push(temporal.ranked.clone());
        }
        let fused = fusion::fuse(&lists);
        let fusion_ms = fusion_started.elapsed().as_millis() as u64;

        // Activation lookup for score breakdowns
        let mut activation_of: HashMap<UnitId, f32> = HashMap::new();
        for (id, activation) in graph_traversal
            .ranked
            .iter()
            .chain(temporal_traversal.iter().flat_map(|t| t.ranked.iter()))
        {
            activation_of
                .entry(*id)
                .and_modify(|a| *a = a.max(*activation))
                .or_insert(*activation);
        }

        // Stage 4: materialize the fused top slice
        let now = Utc::now();
        let mut candidates: Vec<ScoredUnit> = Vec::new();
        for (id, rrf_score) in fused.iter().take(budget) {
            let Ok(unit) = self.store.get_unit(id) else {
                continue;
            };
            if fact_type.is_some_and(|ft| unit.fact_type != ft) {
                continue;
            }
            let semantic_similarity = cosine_similarity(&query_vec, &unit.embedding);
            let recency = ranking::recency_score(unit.event_date, now);
            let frequency = ranking::frequency_score(unit.access_count);
            candidates.push(ScoredUnit {
                score: *rrf_score,
                rrf_score: *rrf_score,
                rerank_score: None,
                activation: activation_of.get(id).copied(),
                semantic_similarity,
                recency,
                frequency,
                final_weight: None,
                token_count: 0,
                unit,
            });
        }

        // Stage 5: cross-encoder rerank; degrade to fused order on failure
        let rerank_started = Instant::now();
        if let Err(err) = self.rerank_client.rerank(query, &mut candidates).await {
            warn!("reranker degraded, keeping fused order: {err}");
            degradations.push(Degradation::RerankerDegraded);
        }
        let rerank_ms = rerank_started.elapsed().as_millis() as u64;

        if let Some(weights) = &options.ranking_weights {
            for candidate in &mut candidates {
                candidate.final_weight = Some(ranking::final_weight(
                    weights,
                    candidate.activation.unwrap_or(0.0),
                    candidate.semantic_similarity,
                    candidate.recency,
                    candidate.frequency,
                ));
            }
        }

        // Stage 6: token budget
        let budget_started = Instant::now();
        let admitted = self
            .token_budget
            .filter(candidates, options.max_tokens, |c| c.unit.text.as_str());
        let results: Vec<ScoredUnit> = admitted
            .into_iter()
            .map(|(mut candidate, tokens)| {
                candidate.token_count = tokens;
                candidate
            })
            .collect();
        let budget_ms = budget_started.elapsed().as_millis() as u64;

        // Stage 7: best-effort access counting, off the response path
        if !results.is_empty() {
            let store = Arc::clone(&self.store);
            let ids: Vec<UnitId> = results.iter().map(|r| r.unit.id).collect();
            tokio::spawn(async move {
                store.increment_access(&ids);
            });
        }

        info!(
            agent = agent_id,
            fused = fused.len(),
            returned = results.len(),
            degraded = !degradations.is_empty(),
            "search complete"
        );

        if let Some(trace) = trace.as_mut() {
            trace.degradations.extend(degradations);
            trace.entry_points = graph_traversal
                .entry_points
                .iter()
                .chain(
                    temporal_traversal
                        .iter()
                        .flat_map(|t| t.entry_points.iter()),
                )
                .cloned()
                .collect();
            trace.visits = graph_traversal
                .visits
                .iter()
                .chain(temporal_traversal.iter().flat_map(|t| t.visits.iter()))
                .cloned()
                .collect();
            trace.prunes = graph_traversal
                .prunes
                .iter()
                .chain(temporal_traversal.iter().flat_map(|t| t.prunes.iter()))
                .cloned()
                .collect();
            trace.path_counts = vec![
                (PathKind::Semantic, semantic_list.len()),
                (PathKind::Keyword, keyword_list.len()),
                (PathKind::Graph, graph_traversal.ranked.len()),
                (
                    PathKind::TemporalGraph,
                    temporal_traversal.as_ref().map_or(0, |t| t.ranked.len()),
                ),
            ];
            trace.durations = StageDurations {
                embed_ms,
                paths_ms,
                fusion_ms,
                rerank_ms,
                budget_ms,
                total_ms: started.elapsed().as_millis() as u64,
            };
        }

        debug!(
            agent = agent_id,
            semantic = semantic_list.len(),
            keyword = keyword_list.len(),
            graph = graph_traversal.ranked.len(),
            "path result counts"
        );

        Ok(SearchResponse { results, trace })
    }
}

fn unwrap_path(
    result: Result<Vec<(UnitId, f32)>>,
    path: PathKind,
    degradations: &mut Vec<Degradation>,
) -> Vec<(UnitId, f32)> {
    match result {
        Ok(list) => list,
        Err(err) => {
            warn!("{path:?} path unavailable: {err}");
            degradations.push(Degradation::PathUnavailable(path, err.to_string()));
            Vec::new()
        }
    }
}
