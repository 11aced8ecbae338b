//! In-memory approximate nearest neighbor index over unit embeddings
//!
//! Graph-based index in the DiskANN family: incremental inserts run a
//! greedy beam search from a fixed entry point, then alpha-prune the
//! candidate set into the node's neighbor list and add reverse edges.
//! Below [`VECTOR_BRUTE_FORCE_THRESHOLD`] live vectors the index answers
//! queries with an exact scan, which keeps small agents (and the dedupe
//! probe) exact while the graph only earns its keep at scale.
//!
//! The index holds one agent's vectors; the store keeps one per agent and
//! rebuilds them from RocksDB at startup. Deletes are soft: removed ids
//! stay in the graph as waypoints but never appear in results.

use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;
use parking_lot::RwLock;

use crate::constants::{
    VECTOR_BRUTE_FORCE_THRESHOLD, VECTOR_FILTER_OVERFETCH, VECTOR_MAX_DEGREE, VECTOR_PRUNE_ALPHA,
    VECTOR_SEARCH_LIST_SIZE,
};
use crate::errors::{MemoryError, Result};
use crate::types::{FactType, UnitId};

/// Vector index configuration
#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    /// Vector dimension; inserts of any other length are rejected
    pub dimension: usize,

    /// Maximum graph degree (R)
    pub max_degree: usize,

    /// Beam width during search and construction (L)
    pub search_list_size: usize,

    /// Alpha for RNG-style pruning
    pub alpha: f32,

    /// Live-vector count below which search is an exact scan
    pub brute_force_threshold: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimension: crate::constants::EMBEDDING_DIMENSION,
            max_degree: VECTOR_MAX_DEGREE,
            search_list_size: VECTOR_SEARCH_LIST_SIZE,
            alpha: VECTOR_PRUNE_ALPHA,
            brute_force_threshold: VECTOR_BRUTE_FORCE_THRESHOLD,
        }
    }
}

struct IndexInner {
    vectors: Vec<Vec<f32>>,
    ids: Vec<UnitId>,
    fact_types: Vec<FactType>,
    /// node -> neighbor node indices
    neighbors: Vec<Vec<u32>>,
    id_map: HashMap<UnitId, u32>,
    deleted: HashSet<u32>,
    /// Entry point for greedy search; re-seated when its node is deleted
    entry: u32,
}

impl IndexInner {
    fn live(&self) -> usize {
        self.ids.len() - self.deleted.len()
    }
}

/// Per-agent ANN index
pub struct VectorIndex {
    config: VectorIndexConfig,
    inner: RwLock<IndexInner>,
}

impl VectorIndex {
    pub fn new(config: VectorIndexConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(IndexInner {
                vectors: Vec::new(),
                ids: Vec::new(),
                fact_types: Vec::new(),
                neighbors: Vec::new(),
                id_map: HashMap::new(),
                deleted: HashSet::new(),
                entry: 0,
            }),
        }
    }

    /// Number of live (not soft-deleted) vectors
    pub fn len(&self) -> usize {
        self.inner.read().live()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a vector, wiring it into the proximity graph
    pub fn insert(&self, id: UnitId, fact_type: FactType, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(MemoryError::invalid_input(
                "embedding",
                format!(
                    "dimension mismatch: expected {}, got {}",
                    self.config.dimension,
                    vector.len()
                ),
            ));
        }

        let mut inner = self.inner.write();

        if let Some(&node) = inner.id_map.get(&id) {
            // Re-insert of a known id: refresh the vector in place. Happens
            // only on startup rebuild replays.
            inner.vectors[node as usize] = vector;
            inner.fact_types[node as usize] = fact_type;
            inner.deleted.remove(&node);
            return Ok(());
        }

        let node = inner.ids.len() as u32;

        let neighbor_ids = if inner.ids.is_empty() {
            Vec::new()
        } else {
            let beam = self.greedy_search(&inner, &vector, self.config.search_list_size, true);
            self.robust_prune(&inner, beam)
        };

        inner.vectors.push(vector);
        inner.ids.push(id);
        inner.fact_types.push(fact_type);
        inner.neighbors.push(neighbor_ids.clone());
        inner.id_map.insert(id, node);

        // Reverse edges, pruning any neighbor that overflows its degree cap
        for neighbor in neighbor_ids {
            let n = neighbor as usize;
            if !inner.neighbors[n].contains(&node) {
                inner.neighbors[n].push(node);
                if inner.neighbors[n].len() > self.config.max_degree {
                    let base = inner.vectors[n].clone();
                    let candidates: Vec<(OrderedFloat<f32>, u32)> = inner.neighbors[n]
                        .iter()
                        .map(|&m| {
                            (
                                OrderedFloat(cosine_distance(&base, &inner.vectors[m as usize])),
                                m,
                            )
                        })
                        .collect();
                    let pruned = self.robust_prune(&inner, candidates);
                    inner.neighbors[n] = pruned;
                }
            }
        }

        if inner.deleted.contains(&inner.entry) {
            inner.entry = node;
        }

        Ok(())
    }

    /// Soft-delete a vector; it stops appearing in results immediately
    pub fn remove(&self, id: &UnitId) {
        let mut inner = self.inner.write();
        if let Some(&node) = inner.id_map.get(id) {
            inner.deleted.insert(node);
            inner.id_map.remove(id);
            if inner.entry == node {
                let fallback = (0..inner.ids.len() as u32)
                    .find(|n| !inner.deleted.contains(n))
                    .unwrap_or(0);
                inner.entry = fallback;
            }
        }
    }

    /// k-nearest search with a similarity floor and optional fact_type
    /// filter
    ///
    /// Similarity is `1 - cosine_distance`. Results are thresholded by
    /// `min_sim` before limiting to `k`; ties break by id ascending.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        min_sim: f32,
        fact_type: Option<FactType>,
    ) -> Result<Vec<(UnitId, f32)>> {
        if query.len() != self.config.dimension {
            return Err(MemoryError::invalid_input(
                "query_vec",
                format!(
                    "dimension mismatch: expected {}, got {}",
                    self.config.dimension,
                    query.len()
                ),
            ));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let inner = self.inner.read();
        if inner.live() == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(UnitId, f32)> = if inner.live() <= self.config.brute_force_threshold {
            self.scan_all(&inner, query, fact_type)
        } else {
            // Over-fetch so post-filtering by fact_type still fills k
            let beam_width = self
                .config
                .search_list_size
                .max(k.saturating_mul(VECTOR_FILTER_OVERFETCH));
            self.greedy_search(&inner, query, beam_width, false)
                .into_iter()
                .filter(|(_, node)| {
                    fact_type.map_or(true, |ft| inner.fact_types[*node as usize] == ft)
                })
                .map(|(dist, node)| (inner.ids[node as usize], 1.0 - dist.0))
                .collect()
        };

        scored.retain(|(_, sim)| *sim >= min_sim);
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn scan_all(
        &self,
        inner: &IndexInner,
        query: &[f32],
        fact_type: Option<FactType>,
    ) -> Vec<(UnitId, f32)> {
        (0..inner.ids.len())
            .filter(|&n| !inner.deleted.contains(&(n as u32)))
            .filter(|&n| fact_type.map_or(true, |ft| inner.fact_types[n] == ft))
            .map(|n| (inner.ids[n], cosine_similarity(query, &inner.vectors[n])))
            .collect()
    }

    /// Beam search from the entry point. Returns (distance, node) pairs
    /// sorted by distance ascending. With `include_deleted`, soft-deleted
    /// nodes stay in the beam so construction can route through them.
    fn greedy_search(
        &self,
        inner: &IndexInner,
        query: &[f32],
        beam_width: usize,
        include_deleted: bool,
    ) -> Vec<(OrderedFloat<f32>, u32)> {
        let mut visited: HashSet<u32> = HashSet::new();
        let mut beam: Vec<(OrderedFloat<f32>, u32)> = Vec::with_capacity(beam_width + 1);

        let entry = inner.entry;
        beam.push((
            OrderedFloat(cosine_distance(query, &inner.vectors[entry as usize])),
            entry,
        ));

        loop {
            // Closest unvisited candidate in the beam
            let next = beam
                .iter()
                .find(|(_, node)| !visited.contains(node))
                .map(|&(dist, node)| (dist, node));

            let Some((_, node)) = next else { break };
            visited.insert(node);

            for &neighbor in &inner.neighbors[node as usize] {
                if visited.contains(&neighbor) || beam.iter().any(|(_, n)| *n == neighbor) {
                    continue;
                }
                let dist =
                    OrderedFloat(cosine_distance(query, &inner.vectors[neighbor as usize]));
                let pos = beam.partition_point(|(d, _)| *d <= dist);
                beam.insert(pos, (dist, neighbor));
                if beam.len() > beam_width {
                    beam.pop();
                }
            }
        }

        if !include_deleted {
            beam.retain(|(_, node)| !inner.deleted.contains(node));
        }
        beam
    }

    /// Alpha-RNG pruning: keep the closest candidate, drop every candidate
    /// it already covers within the alpha slack, repeat up to max_degree.
    /// Candidate distances are relative to the node being wired.
    fn robust_prune(
        &self,
        inner: &IndexInner,
        mut candidates: Vec<(OrderedFloat<f32>, u32)>,
    ) -> Vec<u32> {
        candidates.sort();
        candidates.dedup_by_key(|(_, node)| *node);

        let mut kept: Vec<u32> = Vec::with_capacity(self.config.max_degree);
        while let Some((_, closest)) = candidates.first().copied() {
            kept.push(closest);
            if kept.len() >= self.config.max_degree {
                break;
            }
            let closest_vec = &inner.vectors[closest as usize];
            candidates.retain(|&(dist_to_base, node)| {
                if node == closest {
                    return false;
                }
                let dist_to_kept =
                    cosine_distance(closest_vec, &inner.vectors[node as usize]);
                self.config.alpha * dist_to_kept > dist_to_base.0
            });
        }

        kept
    }
}

/// Cosine similarity; zero vectors compare as orthogonal
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
