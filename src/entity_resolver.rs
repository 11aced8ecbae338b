//! Entity resolution: mapping surface mentions to canonical entity ids
//!
//! Deterministic per-agent policy. Candidates are existing entities of the
//! same kind sharing at least one normalized name token with the surface
//! form. Each candidate is scored on three signals:
//!
//! - name similarity: max normalized edit similarity against every alias
//! - co-occurrence: fraction of the mention's co-mentioned entities that
//!   already appear in the candidate's prior units
//! - temporal proximity: recency of the candidate's last sighting on a
//!   180-day scale
//!
//! The best candidate is accepted at `s >= tau`, with a relaxed tau for
//! exact-name PERSON matches. A near-tie (top two within 0.02) resolves to
//! the entity with the earlier first_seen. Anything else allocates a new
//! entity seeded with the surface form.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::constants::{
    RESOLVER_ACCEPT_THRESHOLD, RESOLVER_AMBIGUITY_MARGIN, RESOLVER_PERSON_EXACT_THRESHOLD,
    RESOLVER_TEMPORAL_SCALE_DAYS, RESOLVER_WEIGHT_COOCCURRENCE, RESOLVER_WEIGHT_NAME,
    RESOLVER_WEIGHT_TEMPORAL,
};
use crate::errors::Result;
use crate::store::MemoryStore;
use crate::types::{Entity, EntityId, EntityKind};

/// Outcome of resolving one mention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Matched an existing entity
    Existing(EntityId),
    /// Allocated a fresh entity
    Created(EntityId),
}

impl Resolution {
    pub fn entity_id(&self) -> EntityId {
        match self {
            Resolution::Existing(id) | Resolution::Created(id) => *id,
        }
    }
}

pub struct EntityResolver {
    store: Arc<MemoryStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Resolve a mention to an entity id, creating one when nothing scores
    /// above threshold
    ///
    /// `co_mentions` are the already-resolved entity ids of sibling
    /// mentions in the same fact.
    pub fn resolve(
        &self,
        agent_id: &str,
        surface: &str,
        kind: EntityKind,
        co_mentions: &[EntityId],
        event_date: DateTime<Utc>,
    ) -> Result<Resolution> {
        let tokens = normalize_tokens(surface);
        if tokens.is_empty() {
            // Pure-punctuation surface; nothing to match on, allocate fresh
            return self
                .create(agent_id, surface, kind, event_date)
                .map(Resolution::Created);
        }

        let candidates = self.store.entities_by_token(agent_id, kind, &tokens)?;

        let mut scored: Vec<(f32, f32, Entity)> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let name_sim = name_similarity(surface, &candidate);
            let co_occurrence = self.co_occurrence(&candidate, co_mentions)?;
            let temporal = temporal_proximity(event_date, candidate.last_seen);

            let score = RESOLVER_WEIGHT_NAME * name_sim
                + RESOLVER_WEIGHT_COOCCURRENCE * co_occurrence
                + RESOLVER_WEIGHT_TEMPORAL * temporal;

            debug!(
                surface,
                candidate = %candidate.canonical_name,
                name_sim,
                co_occurrence,
                temporal,
                score,
                "scored entity candidate"
            );
            scored.push((score, name_sim, candidate));
        }

        // Highest score first; near-ties resolve to the earlier first_seen
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.2.first_seen.cmp(&b.2.first_seen))
        });

        if scored.len() >= 2
            && (scored[0].0 - scored[1].0).abs() <= RESOLVER_AMBIGUITY_MARGIN
            && scored[1].2.first_seen < scored[0].2.first_seen
        {
            scored.swap(0, 1);
        }

        if let Some((score, name_sim, best)) = scored.into_iter().next() {
            let tau = if kind == EntityKind::Person && (name_sim - 1.0).abs() < f32::EPSILON {
                RESOLVER_PERSON_EXACT_THRESHOLD
            } else {
                RESOLVER_ACCEPT_THRESHOLD
            };

            if score >= tau {
                let mut accepted = best;
                let before = accepted.aliases.len();
                accepted.record_mention(surface, event_date);
                let new_tokens = if accepted.aliases.len() > before {
                    normalize_tokens(surface)
                } else {
                    Vec::new()
                };
                self.store.update_entity(&accepted, &new_tokens)?;
                return Ok(Resolution::Existing(accepted.id));
            }
        }

        self.create(agent_id, surface, kind, event_date)
            .map(Resolution::Created)
    }

    fn create(
        &self,
        agent_id: &str,
        surface: &str,
        kind: EntityKind,
        event_date: DateTime<Utc>,
    ) -> Result<EntityId> {
        let entity = Entity {
            id: EntityId::new(),
            agent_id: agent_id.to_string(),
            kind,
            canonical_name: surface.to_string(),
            aliases: vec![surface.to_string()],
            first_seen: event_date,
            last_seen: event_date,
        };
        let tokens = normalize_tokens(surface);
        self.store.insert_entity(&entity, &tokens)?;
        debug!(surface, kind = kind.as_str(), id = %entity.id, "created entity");
        Ok(entity.id)
    }

    /// Fraction of co-mentioned entities that already co-occur with the
    /// candidate in some prior unit
    fn co_occurrence(&self, candidate: &Entity, co_mentions: &[EntityId]) -> Result<f32> {
        if co_mentions.is_empty() {
            return Ok(0.0);
        }
        let candidate_units: HashSet<_> =
            self.store.units_for_entity(&candidate.id)?.into_iter().collect();
        if candidate_units.is_empty() {
            return Ok(0.0);
        }

        let mut shared = 0usize;
        for co in co_mentions {
            let units = self.store.units_for_entity(co)?;
            if units.iter().any(|u| candidate_units.contains(u)) {
                shared += 1;
            }
        }
        Ok(shared as f32 / co_mentions.len() as f32)
    }
}

/// Lowercase, punctuation-stripped name tokens
pub fn normalize_tokens(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn normalize_joined(s: &str) -> String {
    normalize_tokens(s).join(" ")
}

/// Max normalized edit similarity between the surface and every known name
/// of the entity
fn name_similarity(surface: &str, entity: &Entity) -> f32 {
    let surface_norm = normalize_joined(surface);
    entity
        .aliases
        .iter()
        .chain(std::iter::once(&entity.canonical_name))
        .map(|alias| strsim::normalized_levenshtein(&surface_norm, &normalize_joined(alias)) as f32)
        .fold(0.0, f32::max)
}

/// 1 - min(1, |event_date - last_seen| / 180 days)
fn temporal_proximity(event_date: DateTime<Utc>, last_seen: DateTime<Utc>) -> f32 {
    let gap_days = (event_date - last_seen).num_seconds().abs() as f64 / 86_400.0;
    (1.0 - (gap_days / RESOLVER_TEMPORAL_SCALE_DAYS).min(1.0)) as f32
}
