//! Core data model: memory units, entities, mentions, links
//!
//! Units are the atomic retrievable facts. Entities are canonical identities
//! shared across units of the same agent. Links are weighted edges between
//! units; all three indexes (vector, full-text, graph) are projections of
//! these records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for memory units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)] // Serialize as plain UUID string, not array
pub struct UnitId(pub Uuid);

impl UnitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse partitioning tag applied as a retrieval filter, not a structural
/// distinction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    /// Facts about the world the agent operates in
    World,
    /// Facts about the agent itself
    Agent,
    /// Subjective assessments the agent has formed
    Opinion,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::World => "world",
            FactType::Agent => "agent",
            FactType::Opinion => "opinion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "world" => Some(FactType::World),
            "agent" => Some(FactType::Agent),
            "opinion" => Some(FactType::Opinion),
            _ => None,
        }
    }
}

impl std::fmt::Display for FactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The atomic retrievable fact
///
/// `text` is a self-contained narrative fact: coreferences resolved,
/// participants and reasoning preserved. It is immutable after insertion;
/// updates create a new unit. The full-text posting list for the unit lives
/// in the BM25 index and is derived from `text` at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUnit {
    pub id: UnitId,

    /// Owning namespace; no cross-agent retrieval
    pub agent_id: String,

    pub text: String,

    pub fact_type: FactType,

    /// Timestamp at which the fact became true. Past values allowed;
    /// independent of insertion order.
    pub event_date: DateTime<Utc>,

    /// Insertion timestamp
    pub created_at: DateTime<Utc>,

    /// Fixed-dimension L2-normalized vector over the date-augmented text
    pub embedding: Vec<f32>,

    /// Incremented when this unit is included in a retrieval result.
    /// Eventually consistent; increments may be dropped under shutdown.
    pub access_count: u64,

    /// Optional short free-text context, prefixed into reranker input
    pub context: Option<String>,

    /// Optional grouping key for upsert/cascade
    pub document_id: Option<String>,
}

/// Entity type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Person,
    Org,
    Location,
    Product,
    Concept,
    Other,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "PERSON",
            EntityKind::Org => "ORG",
            EntityKind::Location => "LOCATION",
            EntityKind::Product => "PRODUCT",
            EntityKind::Concept => "CONCEPT",
            EntityKind::Other => "OTHER",
        }
    }
}

/// A canonical identity
///
/// Created on first unresolved mention; never deleted while referenced.
/// Aliases accumulate every accepted surface form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub agent_id: String,
    pub kind: EntityKind,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Entity {
    /// Record an accepted surface form and sighting date
    pub fn record_mention(&mut self, surface: &str, event_date: DateTime<Utc>) {
        if !self.aliases.iter().any(|a| a == surface) {
            self.aliases.push(surface.to_string());
        }
        if event_date > self.last_seen {
            self.last_seen = event_date;
        }
    }
}

/// Junction between a unit and an entity; unique per pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityMention {
    pub unit_id: UnitId,
    pub entity_id: EntityId,
}

/// Edge class between two units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Temporal,
    Semantic,
    Entity,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Temporal => "temporal",
            LinkType::Semantic => "semantic",
            LinkType::Entity => "entity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "temporal" => Some(LinkType::Temporal),
            "semantic" => Some(LinkType::Semantic),
            "entity" => Some(LinkType::Entity),
            _ => None,
        }
    }
}

/// Typed per-link metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkMetadata {
    Temporal { time_delta_seconds: i64 },
    Semantic { similarity: f32 },
    Entity { entity_id: EntityId },
}

impl LinkMetadata {
    pub fn link_type(&self) -> LinkType {
        match self {
            LinkMetadata::Temporal { .. } => LinkType::Temporal,
            LinkMetadata::Semantic { .. } => LinkType::Semantic,
            LinkMetadata::Entity { .. } => LinkType::Entity,
        }
    }
}

/// Weighted edge between two units
///
/// Bidirectional semantics: both directions are stored, so traversal reads
/// outgoing links only. At most one link of each type per ordered pair;
/// re-upserting keeps the greater weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub from: UnitId,
    pub to: UnitId,
    pub link_type: LinkType,
    /// Always within [0, 1]; temporal links never below 0.3, entity links
    /// exactly 1.0
    pub weight: f32,
    pub metadata: LinkMetadata,
}
