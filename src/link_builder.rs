//! Link construction after unit insertion
//!
//! Three link classes are produced in one batch per inserted unit, all
//! against the same store snapshot with no ordering dependency among them:
//!
//! - temporal: every same-agent unit within the event-date window, weighted
//!   by proximity, bounded by an indexed range scan and a nearest-neighbor
//!   cap
//! - semantic: top-K vector neighbors above the similarity threshold
//! - entity: full weight to every prior unit sharing a resolved entity
//!
//! Failures here never roll back the unit; the ingestor logs and moves on,
//! and a later repair pass can re-run this builder for a linkless unit.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::constants::{TEMPORAL_LINK_MAX_NEIGHBORS, TEMPORAL_LINK_MIN_WEIGHT};
use crate::errors::Result;
use crate::store::MemoryStore;
use crate::types::{EntityId, LinkMetadata, LinkType, MemoryUnit, UnitId};

/// Per-class link counts for one build (logged, returned for tests)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    pub temporal: usize,
    pub semantic: usize,
    pub entity: usize,
}

impl LinkReport {
    pub fn total(&self) -> usize {
        self.temporal + self.semantic + self.entity
    }
}

pub struct LinkBuilder {
    store: Arc<MemoryStore>,
    window: Duration,
    semantic_k: usize,
    semantic_threshold: f32,
}

impl LinkBuilder {
    pub fn new(store: Arc<MemoryStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            window: Duration::hours(config.temporal_link_window_hours),
            semantic_k: config.semantic_link_k,
            semantic_threshold: config.semantic_link_threshold,
        }
    }

    /// Build all three link classes for a freshly inserted unit
    ///
    /// All classes are computed against the same store snapshot and written
    /// in one batch.
    pub fn build(&self, unit: &MemoryUnit, entity_ids: &[EntityId]) -> Result<LinkReport> {
        let temporal = self.temporal_links(unit)?;
        let semantic = self.semantic_links(unit)?;
        let entity = self.entity_links(&unit.id, entity_ids)?;

        let report = LinkReport {
            temporal: temporal.len(),
            semantic: semantic.len(),
            entity: entity.len(),
        };

        let mut links = temporal;
        links.extend(semantic);
        links.extend(entity);
        self.store.upsert_links(&links)?;

        debug!(
            unit = %unit.id,
            temporal = report.temporal,
            semantic = report.semantic,
            entity = report.entity,
            "links built"
        );
        Ok(report)
    }

    /// weight = max(0.3, 1 - |dt| / W) for every same-agent unit within the
    /// window, capped to the nearest neighbors
    fn temporal_links(&self, unit: &MemoryUnit) -> Result<Vec<PendingLink>> {
        let start = unit.event_date - self.window;
        let end = unit.event_date + self.window;

        let mut candidates: Vec<(UnitId, i64)> = self
            .store
            .units_in_range(&unit.agent_id, start, end)?
            .into_iter()
            .filter(|(id, _)| *id != unit.id)
            .map(|(id, event_date)| {
                let delta = (unit.event_date - event_date).num_seconds();
                (id, delta)
            })
            .collect();

        // Nearest first; dense days would otherwise go quadratic
        candidates.sort_by_key(|(_, delta)| delta.abs());
        candidates.truncate(TEMPORAL_LINK_MAX_NEIGHBORS);

        let window_secs = self.window.num_seconds() as f32;
        Ok(candidates
            .into_iter()
            .map(|(neighbor, delta)| {
                let weight =
                    (1.0 - (delta.abs() as f32 / window_secs)).max(TEMPORAL_LINK_MIN_WEIGHT);
                (
                    unit.id,
                    neighbor,
                    LinkType::Temporal,
                    weight,
                    LinkMetadata::Temporal {
                        time_delta_seconds: delta,
                    },
                )
            })
            .collect())
    }

    /// Top-K vector neighbors above theta_sem, weighted by similarity
    fn semantic_links(&self, unit: &MemoryUnit) -> Result<Vec<PendingLink>> {
        let neighbors = self.store.vector_knn(
            &unit.agent_id,
            None,
            &unit.embedding,
            self.semantic_k,
            self.semantic_threshold,
        )?;

        Ok(neighbors
            .into_iter()
            .filter(|(neighbor, _)| *neighbor != unit.id)
            .map(|(neighbor, similarity)| {
                (
                    unit.id,
                    neighbor,
                    LinkType::Semantic,
                    similarity.clamp(0.0, 1.0),
                    LinkMetadata::Semantic { similarity },
                )
            })
            .collect())
    }

    /// Full-weight links to every prior unit of every resolved entity
    fn entity_links(&self, unit_id: &UnitId, entity_ids: &[EntityId]) -> Result<Vec<PendingLink>> {
        let mut links = Vec::new();
        for entity_id in entity_ids {
            for prior in self.store.units_for_entity(entity_id)? {
                if prior == *unit_id {
                    continue;
                }
                links.push((
                    *unit_id,
                    prior,
                    LinkType::Entity,
                    crate::constants::ENTITY_LINK_WEIGHT,
                    LinkMetadata::Entity {
                        entity_id: *entity_id,
                    },
                ));
            }
        }
        Ok(links)
    }
}

type PendingLink = (UnitId, UnitId, LinkType, f32, LinkMetadata);
