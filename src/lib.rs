//! Engram-Memory Library
//!
//! Long-term conversational memory engine for AI agents.
//! Ingests natural-language content as self-contained narrative facts and
//! answers queries through a parallel multi-strategy retrieval pipeline.
//!
//! # Key Features
//! - Multi-index memory graph (temporal, semantic, entity links)
//! - Four parallel retrieval paths: vector kNN, BM25, spreading activation,
//!   time-filtered spreading activation
//! - Reciprocal-rank fusion, cross-encoder reranking, token-budget filtering
//! - RocksDB embedded storage (no external database)
//!
//! # External Collaborators
//! The fact extractor, embedder, reranker, and temporal parser are opaque
//! services behind the traits in [`providers`]; swap them at runtime, stub
//! them in tests.

pub mod config;
pub mod constants;
pub mod engine;
pub mod entity_resolver;
pub mod errors;
pub mod ingest;
pub mod link_builder;
pub mod providers;
pub mod retrieval;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export dependencies to ensure tests/benchmarks use the same version
pub use chrono;
pub use parking_lot;
pub use uuid;

pub use config::{EngineConfig, RankingWeights};
pub use engine::{Collaborators, MemoryEngine};
pub use errors::{MemoryError, Result};
pub use types::{
    Entity, EntityId, EntityKind, EntityMention, FactType, Link, LinkType, MemoryUnit, UnitId,
};
