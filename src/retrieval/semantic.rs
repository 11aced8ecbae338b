//! Semantic retrieval path: vector kNN over unit embeddings

use crate::constants::SEMANTIC_PATH_MIN_SIMILARITY;
use crate::errors::Result;
use crate::store::MemoryStore;
use crate::types::{FactType, UnitId};

/// kNN with k = thinking_budget and a permissive similarity floor
///
/// Ordering is (similarity desc, id asc); at most `thinking_budget` items.
pub fn query(
    store: &MemoryStore,
    agent_id: &str,
    fact_type: Option<FactType>,
    query_vec: &[f32],
    thinking_budget: usize,
) -> Result<Vec<(UnitId, f32)>> {
    store.vector_knn(
        agent_id,
        fact_type,
        query_vec,
        thinking_budget,
        SEMANTIC_PATH_MIN_SIMILARITY,
    )
}
