//! Graph retrieval path: spreading activation
//!
//! Entry points come from a narrow vector probe; activation then spreads
//! through the unit graph with per-hop decay, a max-priority frontier, and
//! a visit budget. Activations are monotone non-increasing along any path,
//! so with default weights the spread dies out after four to five hops.
//!
//! Every pruning decision is recorded when tracing is on:
//! already-visited, below-activation-floor, budget-exhausted, and
//! link-weight-below-threshold.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use ordered_float::OrderedFloat;

use crate::constants::{
    GRAPH_ACTIVATION_FLOOR, GRAPH_DECAY, GRAPH_ENTRY_K, GRAPH_ENTRY_MIN_SIMILARITY,
    GRAPH_LINK_WEIGHT_FLOOR,
};
use crate::errors::Result;
use crate::store::{cosine_similarity, MemoryStore};
use crate::types::{FactType, LinkType, UnitId};

use super::trace::{EntryPoint, NodeVisit, PathKind, PruneReason, PruneRecord};

/// Output of one spreading-activation traversal
#[derive(Debug, Default)]
pub struct Traversal {
    /// (unit, activation) ranked activation desc, id asc
    pub ranked: Vec<(UnitId, f32)>,
    pub entry_points: Vec<EntryPoint>,
    pub visits: Vec<NodeVisit>,
    pub prunes: Vec<PruneRecord>,
    /// Set when the traversal stopped on the per-query deadline
    pub deadline_hit: bool,
}

/// Frontier entry; max-heap on activation, ties prefer the smaller id
#[derive(Debug, Clone, Copy)]
struct Frontier {
    activation: OrderedFloat<f32>,
    id: UnitId,
    parent: Option<UnitId>,
    link_type: Option<LinkType>,
    link_weight: Option<f32>,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.activation == other.activation && self.id == other.id
    }
}
impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.activation
            .cmp(&other.activation)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Spreading activation from semantic entry points
///
/// `fact_type` gates what is recorded in results; mismatched units still
/// conduct activation so a filtered query can reach matching units through
/// them. The visit budget bounds total work either way.
pub fn spreading_activation(
    store: &MemoryStore,
    agent_id: &str,
    fact_type: Option<FactType>,
    query_vec: &[f32],
    thinking_budget: usize,
    deadline: Option<Instant>,
    collect_trace: bool,
) -> Result<Traversal> {
    let mut traversal = Traversal::default();
    if thinking_budget == 0 {
        return Ok(traversal);
    }

    let entries = store.vector_knn(
        agent_id,
        fact_type,
        query_vec,
        GRAPH_ENTRY_K,
        GRAPH_ENTRY_MIN_SIMILARITY,
    )?;

    let mut queue: BinaryHeap<Frontier> = BinaryHeap::new();
    for (id, similarity) in &entries {
        traversal.entry_points.push(EntryPoint {
            path: PathKind::Graph,
            unit_id: *id,
            similarity: *similarity,
        });
        queue.push(Frontier {
            activation: OrderedFloat(*similarity),
            id: *id,
            parent: None,
            link_type: None,
            link_weight: None,
        });
    }

    let mut visited: HashSet<UnitId> = HashSet::new();
    let mut result: HashMap<UnitId, f32> = HashMap::new();

    while visited.len() < thinking_budget {
        let Some(frontier) = queue.pop() else { break };
        let activation = frontier.activation.0;

        if visited.contains(&frontier.id) {
            if collect_trace {
                traversal.prunes.push(PruneRecord {
                    node_id: frontier.id,
                    reason: PruneReason::AlreadyVisited,
                });
            }
            continue;
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                traversal.deadline_hit = true;
                break;
            }
        }

        visited.insert(frontier.id);

        // Record only matching fact types; mismatches stay conductive
        let unit = match store.get_unit(&frontier.id) {
            Ok(unit) => unit,
            Err(_) => continue,
        };
        let matches_filter = fact_type.map_or(true, |ft| unit.fact_type == ft);
        if matches_filter {
            result
                .entry(frontier.id)
                .and_modify(|a| *a = a.max(activation))
                .or_insert(activation);
        }

        if collect_trace {
            traversal.visits.push(NodeVisit {
                node_id: frontier.id,
                step: traversal.visits.len(),
                parent_id: frontier.parent,
                link_type: frontier.link_type,
                link_weight: frontier.link_weight,
                activation,
                semantic_similarity: cosine_similarity(query_vec, &unit.embedding),
                final_weight: activation,
                rank: None,
            });
        }

        for link in store.neighbors(&frontier.id, 0.0)? {
            if link.weight < GRAPH_LINK_WEIGHT_FLOOR {
                if collect_trace {
                    traversal.prunes.push(PruneRecord {
                        node_id: link.to,
                        reason: PruneReason::LinkWeightBelowThreshold,
                    });
                }
                continue;
            }

            let propagated = activation * link.weight * GRAPH_DECAY;
            if propagated <= GRAPH_ACTIVATION_FLOOR {
                if collect_trace {
                    traversal.prunes.push(PruneRecord {
                        node_id: link.to,
                        reason: PruneReason::BelowActivationFloor,
                    });
                }
                continue;
            }

            let better = result.get(&link.to).map_or(true, |a| propagated > *a);
            if !visited.contains(&link.to) || better {
                queue.push(Frontier {
                    activation: OrderedFloat(propagated),
                    id: link.to,
                    parent: Some(frontier.id),
                    link_type: Some(link.link_type),
                    link_weight: Some(link.weight),
                });
            } else if collect_trace {
                traversal.prunes.push(PruneRecord {
                    node_id: link.to,
                    reason: PruneReason::AlreadyVisited,
                });
            }
        }
    }

    if collect_trace {
        for frontier in queue.drain() {
            if !visited.contains(&frontier.id) {
                traversal.prunes.push(PruneRecord {
                    node_id: frontier.id,
                    reason: PruneReason::BudgetExhausted,
                });
            }
        }
    }

    let mut ranked: Vec<(UnitId, f32)> = result.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    if collect_trace {
        let rank_of: HashMap<UnitId, usize> = ranked
            .iter()
            .enumerate()
            .map(|(rank, (id, _))| (*id, rank))
            .collect();
        for visit in &mut traversal.visits {
            visit.rank = rank_of.get(&visit.node_id).copied();
        }
    }

    traversal.ranked = ranked;
    Ok(traversal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VectorIndexConfig;
    use crate::types::{LinkMetadata, MemoryUnit};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (Arc<MemoryStore>, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let store = Arc::new(
            MemoryStore::new(
                dir.path(),
                VectorIndexConfig {
                    dimension: 4,
                    ..Default::default()
                },
            )
            .expect("store"),
        );
        (store, dir)
    }

    fn insert_unit(store: &MemoryStore, agent: &str, embedding: Vec<f32>) -> UnitId {
        let unit = MemoryUnit {
            id: UnitId::new(),
            agent_id: agent.to_string(),
            text: format!("unit {}", UnitId::new()),
            fact_type: FactType::World,
            event_date: Utc::now(),
            created_at: Utc::now(),
            embedding,
            access_count: 0,
            context: None,
            document_id: None,
        };
        store.insert_unit(&unit, &[]).unwrap();
        unit.id
    }

    fn link(store: &MemoryStore, a: &UnitId, b: &UnitId, weight: f32) {
        store
            .upsert_link(
                a,
                b,
                LinkType::Semantic,
                weight,
                LinkMetadata::Semantic { similarity: weight },
            )
            .unwrap();
    }

    #[test]
    fn test_activation_monotone_along_path() {
        let (store, _dir) = setup();
        // Entry matches the query exactly; two hops chained behind it
        let entry = insert_unit(&store, "a1", vec![1.0, 0.0, 0.0, 0.0]);
        let hop1 = insert_unit(&store, "a1", vec![0.0, 1.0, 0.0, 0.0]);
        let hop2 = insert_unit(&store, "a1", vec![0.0, 0.0, 1.0, 0.0]);
        link(&store, &entry, &hop1, 0.9);
        link(&store, &hop1, &hop2, 0.9);

        let traversal = spreading_activation(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            100,
            None,
            true,
        )
        .unwrap();

        let activation_of = |id: &UnitId| {
            traversal
                .ranked
                .iter()
                .find(|(rid, _)| rid == id)
                .map(|(_, a)| *a)
                .unwrap()
        };

        let a_entry = activation_of(&entry);
        let a_hop1 = activation_of(&hop1);
        let a_hop2 = activation_of(&hop2);
        assert!(a_entry > a_hop1);
        assert!(a_hop1 > a_hop2);

        // entry 1.0 -> hop1 = 1.0 * 0.9 * 0.8 = 0.72
        assert!((a_hop1 - 0.72).abs() < 0.01);
    }

    #[test]
    fn test_weak_links_are_not_traversed() {
        let (store, _dir) = setup();
        let entry = insert_unit(&store, "a1", vec![1.0, 0.0, 0.0, 0.0]);
        let unreachable = insert_unit(&store, "a1", vec![0.0, 1.0, 0.0, 0.0]);
        link(&store, &entry, &unreachable, 0.05);

        let traversal = spreading_activation(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            100,
            None,
            true,
        )
        .unwrap();

        assert!(traversal.ranked.iter().all(|(id, _)| *id != unreachable));
        assert!(traversal
            .prunes
            .iter()
            .any(|p| p.reason == PruneReason::LinkWeightBelowThreshold));
    }

    #[test]
    fn test_budget_bounds_visits() {
        let (store, _dir) = setup();
        let entry = insert_unit(&store, "a1", vec![1.0, 0.0, 0.0, 0.0]);
        let mut prev = entry;
        for _ in 0..6 {
            let next = insert_unit(&store, "a1", vec![0.0, 1.0, 0.0, 0.0]);
            link(&store, &prev, &next, 0.95);
            prev = next;
        }

        let traversal = spreading_activation(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            3,
            None,
            true,
        )
        .unwrap();

        assert!(traversal.ranked.len() <= 3);
        assert!(traversal
            .prunes
            .iter()
            .any(|p| p.reason == PruneReason::BudgetExhausted));
    }

    #[test]
    fn test_zero_budget_returns_empty_without_reads() {
        let (store, _dir) = setup();
        let traversal =
            spreading_activation(&store, "a1", None, &[1.0, 0.0, 0.0, 0.0], 0, None, false)
                .unwrap();
        assert!(traversal.ranked.is_empty());
        assert!(traversal.entry_points.is_empty());
    }

    #[test]
    fn test_no_entry_points_yields_empty() {
        let (store, _dir) = setup();
        insert_unit(&store, "a1", vec![0.0, 1.0, 0.0, 0.0]);

        // Orthogonal query: nothing clears the 0.5 entry similarity floor
        let traversal = spreading_activation(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            100,
            None,
            false,
        )
        .unwrap();
        assert!(traversal.ranked.is_empty());
    }
}
