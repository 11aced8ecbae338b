//! Temporal-graph retrieval path: time-filtered spreading activation
//!
//! Runs only when the temporal parser produced a date range. Entry points
//! are in-range units with enough semantic similarity to the query; the
//! spread then follows temporal links only, with a stronger per-hop decay.
//! Nodes outside the range are never added, and in-range nodes below the
//! similarity floor are never added: time-only filtering leaks across
//! subjects, so semantic co-filtering is mandatory.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;

use crate::constants::{
    GRAPH_ACTIVATION_FLOOR, GRAPH_LINK_WEIGHT_FLOOR, TEMPORAL_PATH_DECAY,
    TEMPORAL_PATH_MIN_SIMILARITY, TEMPORAL_SEMANTIC_BONUS,
};
use crate::errors::Result;
use crate::store::{cosine_similarity, MemoryStore};
use crate::types::{FactType, LinkType, UnitId};

use super::graph::Traversal;
use super::trace::{EntryPoint, NodeVisit, PathKind, PruneRecord, PruneReason};

/// Time-filtered spreading activation over temporal links
pub fn temporal_spreading(
    store: &MemoryStore,
    agent_id: &str,
    fact_type: Option<FactType>,
    query_vec: &[f32],
    range: (DateTime<Utc>, DateTime<Utc>),
    thinking_budget: usize,
    deadline: Option<Instant>,
    collect_trace: bool,
) -> Result<Traversal> {
    let (start, end) = range;
    let mut traversal = Traversal::default();
    if thinking_budget == 0 || end < start {
        return Ok(traversal);
    }

    let midpoint = start + (end - start) / 2;
    // Guard degenerate single-instant ranges
    let radius_secs = ((end - start).num_seconds() as f64 / 2.0).max(1.0);

    let proximity = |event: DateTime<Utc>| -> f32 {
        let offset = (event - midpoint).num_seconds().abs() as f64;
        (1.0 - offset / radius_secs).clamp(0.0, 1.0) as f32
    };

    struct Candidate {
        activation: OrderedFloat<f32>,
        id: UnitId,
        parent: Option<UnitId>,
        link_weight: Option<f32>,
        similarity: f32,
    }
    impl PartialEq for Candidate {
        fn eq(&self, other: &Self) -> bool {
            self.activation == other.activation && self.id == other.id
        }
    }
    impl Eq for Candidate {}
    impl Ord for Candidate {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.activation
                .cmp(&other.activation)
                .then_with(|| other.id.cmp(&self.id))
        }
    }
    impl PartialOrd for Candidate {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut queue: BinaryHeap<Candidate> = BinaryHeap::new();

    // Entry points: in-range units passing the semantic floor
    for (id, event_date) in store.units_in_range(agent_id, start, end)? {
        let Ok(unit) = store.get_unit(&id) else { continue };
        if fact_type.is_some_and(|ft| unit.fact_type != ft) {
            continue;
        }
        let similarity = cosine_similarity(query_vec, &unit.embedding);
        if similarity < TEMPORAL_PATH_MIN_SIMILARITY {
            continue;
        }
        let activation = proximity(event_date) + TEMPORAL_SEMANTIC_BONUS * similarity;
        traversal.entry_points.push(EntryPoint {
            path: PathKind::TemporalGraph,
            unit_id: id,
            similarity,
        });
        queue.push(Candidate {
            activation: OrderedFloat(activation),
            id,
            parent: None,
            link_weight: None,
            similarity,
        });
    }

    let mut visited: HashSet<UnitId> = HashSet::new();
    let mut result: HashMap<UnitId, f32> = HashMap::new();

    while visited.len() < thinking_budget {
        let Some(candidate) = queue.pop() else { break };
        let activation = candidate.activation.0;

        if visited.contains(&candidate.id) {
            if collect_trace {
                traversal.prunes.push(PruneRecord {
                    node_id: candidate.id,
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

        visited.insert(candidate.id);
        result
            .entry(candidate.id)
            .and_modify(|a| *a = a.max(activation))
            .or_insert(activation);

        if collect_trace {
            traversal.visits.push(NodeVisit {
                node_id: candidate.id,
                step: traversal.visits.len(),
                parent_id: candidate.parent,
                link_type: candidate.parent.map(|_| LinkType::Temporal),
                link_weight: candidate.link_weight,
                activation,
                semantic_similarity: candidate.similarity,
                final_weight: activation,
                rank: None,
            });
        }

        // Spread only along temporal links
        for link in store.neighbors(&candidate.id, 0.0)? {
            if link.link_type != LinkType::Temporal {
                continue;
            }
            if link.weight < GRAPH_LINK_WEIGHT_FLOOR {
                if collect_trace {
                    traversal.prunes.push(PruneRecord {
                        node_id: link.to,
                        reason: PruneReason::LinkWeightBelowThreshold,
                    });
                }
                continue;
            }
            if visited.contains(&link.to) {
                continue;
            }

            let propagated = activation * link.weight * TEMPORAL_PATH_DECAY;
            if propagated <= GRAPH_ACTIVATION_FLOOR {
                if collect_trace {
                    traversal.prunes.push(PruneRecord {
                        node_id: link.to,
                        reason: PruneReason::BelowActivationFloor,
                    });
                }
                continue;
            }

            // Range and similarity gates on the target node
            let Ok(target) = store.get_unit(&link.to) else { continue };
            if target.event_date < start || target.event_date > end {
                continue;
            }
            if fact_type.is_some_and(|ft| target.fact_type != ft) {
                continue;
            }
            let similarity = cosine_similarity(query_vec, &target.embedding);
            if similarity < TEMPORAL_PATH_MIN_SIMILARITY {
                continue;
            }

            queue.push(Candidate {
                activation: OrderedFloat(propagated),
                id: link.to,
                parent: Some(candidate.id),
                link_weight: Some(link.weight),
                similarity,
            });
        }
    }

    if collect_trace {
        for candidate in queue.drain() {
            if !visited.contains(&candidate.id) {
                traversal.prunes.push(PruneRecord {
                    node_id: candidate.id,
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
    traversal.ranked = ranked;
    Ok(traversal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VectorIndexConfig;
    use crate::types::{LinkMetadata, MemoryUnit};
    use chrono::Duration;
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

    fn insert_unit_at(
        store: &MemoryStore,
        agent: &str,
        embedding: Vec<f32>,
        event_date: DateTime<Utc>,
    ) -> UnitId {
        let unit = MemoryUnit {
            id: UnitId::new(),
            agent_id: agent.to_string(),
            text: format!("unit {}", UnitId::new()),
            fact_type: FactType::World,
            event_date,
            created_at: Utc::now(),
            embedding,
            access_count: 0,
            context: None,
            document_id: None,
        };
        store.insert_unit(&unit, &[]).unwrap();
        unit.id
    }

    #[test]
    fn test_out_of_range_units_excluded() {
        let (store, _dir) = setup();
        let now = Utc::now();
        let inside = insert_unit_at(&store, "a1", vec![1.0, 0.0, 0.0, 0.0], now);
        let outside = insert_unit_at(
            &store,
            "a1",
            vec![1.0, 0.0, 0.0, 0.0],
            now - Duration::days(30),
        );

        let traversal = temporal_spreading(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            (now - Duration::days(1), now + Duration::days(1)),
            100,
            None,
            false,
        )
        .unwrap();

        assert!(traversal.ranked.iter().any(|(id, _)| *id == inside));
        assert!(traversal.ranked.iter().all(|(id, _)| *id != outside));
    }

    #[test]
    fn test_low_similarity_in_range_units_excluded() {
        let (store, _dir) = setup();
        let now = Utc::now();
        let dissimilar = insert_unit_at(&store, "a1", vec![0.0, 1.0, 0.0, 0.0], now);

        let traversal = temporal_spreading(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            (now - Duration::days(1), now + Duration::days(1)),
            100,
            None,
            false,
        )
        .unwrap();

        assert!(traversal.ranked.iter().all(|(id, _)| *id != dissimilar));
    }

    #[test]
    fn test_spread_follows_temporal_links_only() {
        let (store, _dir) = setup();
        let now = Utc::now();
        // Entry is similar; neighbor is in range and moderately similar but
        // only reachable through a link
        let entry = insert_unit_at(&store, "a1", vec![1.0, 0.0, 0.0, 0.0], now);
        let temporal_neighbor = insert_unit_at(
            &store,
            "a1",
            vec![0.7, 0.7, 0.0, 0.0],
            now + Duration::hours(2),
        );
        let semantic_neighbor = insert_unit_at(
            &store,
            "a1",
            vec![0.7, 0.0, 0.7, 0.0],
            now + Duration::hours(3),
        );

        store
            .upsert_link(
                &entry,
                &temporal_neighbor,
                LinkType::Temporal,
                0.9,
                LinkMetadata::Temporal {
                    time_delta_seconds: 7200,
                },
            )
            .unwrap();
        store
            .upsert_link(
                &entry,
                &semantic_neighbor,
                LinkType::Semantic,
                0.9,
                LinkMetadata::Semantic { similarity: 0.9 },
            )
            .unwrap();

        // Use a probe orthogonal enough that only `entry` is an entry point
        // but neighbors still clear the 0.4 similarity floor
        let traversal = temporal_spreading(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            (now - Duration::hours(1), now + Duration::hours(1)),
            100,
            None,
            false,
        )
        .unwrap();

        // temporal_neighbor is outside the range, so it is excluded too;
        // semantic_neighbor must never appear regardless
        assert!(traversal
            .ranked
            .iter()
            .all(|(id, _)| *id != semantic_neighbor));
        assert!(traversal.ranked.iter().any(|(id, _)| *id == entry));
    }

    #[test]
    fn test_empty_range_produces_empty_path() {
        let (store, _dir) = setup();
        let now = Utc::now();
        insert_unit_at(&store, "a1", vec![1.0, 0.0, 0.0, 0.0], now);

        let traversal = temporal_spreading(
            &store,
            "a1",
            None,
            &[1.0, 0.0, 0.0, 0.0],
            (now + Duration::days(100), now + Duration::days(101)),
            100,
            None,
            false,
        )
        .unwrap();
        assert!(traversal.ranked.is_empty());
    }
}
