//! Write path: extract, embed, dedupe, insert, link
//!
//! Ingestion is per-fact resilient. The extractor runs once per call; each
//! extracted fact then embeds (with bounded retry), probes for duplicates,
//! resolves its entity mentions, inserts, and links. A failed fact is
//! recorded in the report and its siblings proceed. Link-construction
//! failures never roll back the inserted unit.
//!
//! Supplying a `document_id` gives upsert semantics: previous units of the
//! document are deleted (cascading links and mentions) before the new batch
//! is inserted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::constants::{EMBED_MAX_ATTEMPTS, EMBED_RETRY_BACKOFF_MS};
use crate::entity_resolver::EntityResolver;
use crate::errors::{MemoryError, Result};
use crate::link_builder::LinkBuilder;
use crate::providers::{Embedder, ExtractedFact, FactExtractor};
use crate::store::MemoryStore;
use crate::types::{EntityId, MemoryUnit, UnitId};

/// What happened to one extracted fact
#[derive(Debug)]
pub enum FactOutcome {
    /// A new unit was inserted
    Inserted(UnitId),
    /// An existing unit already covers this fact; nothing was written
    Deduplicated(UnitId),
    /// This fact failed; siblings were unaffected
    Failed { text: String, error: MemoryError },
}

/// Result of one ingest call
#[derive(Debug, Default)]
pub struct IngestReport {
    pub outcomes: Vec<FactOutcome>,
    /// Units removed by document upsert before insertion
    pub replaced_units: Vec<UnitId>,
}

impl IngestReport {
    /// Ids of units inserted by this call
    pub fn inserted_ids(&self) -> Vec<UnitId> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                FactOutcome::Inserted(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FactOutcome::Failed { .. }))
            .count()
    }
}

pub struct Ingestor {
    store: Arc<MemoryStore>,
    resolver: EntityResolver,
    link_builder: LinkBuilder,
    extractor: Arc<dyn FactExtractor>,
    embedder: Arc<dyn Embedder>,
    embedding_dimension: usize,
    dedupe_threshold: f32,
}

impl Ingestor {
    pub fn new(
        store: Arc<MemoryStore>,
        config: &EngineConfig,
        extractor: Arc<dyn FactExtractor>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(Arc::clone(&store)),
            link_builder: LinkBuilder::new(Arc::clone(&store), config),
            store,
            extractor,
            embedder,
            embedding_dimension: config.embedding_dimension,
            dedupe_threshold: config.dedupe_threshold,
        }
    }

    /// Ingest content for an agent
    ///
    /// After this returns, retrieval for the agent observes the new units
    /// and all their links.
    pub async fn ingest(
        &self,
        agent_id: &str,
        content: &str,
        event_date: DateTime<Utc>,
        document_id: Option<&str>,
    ) -> Result<IngestReport> {
        if agent_id.is_empty() {
            return Err(MemoryError::invalid_input("agent_id", "must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(MemoryError::invalid_input("content", "must not be empty"));
        }

        let mut report = IngestReport::default();

        // Document upsert: clear the previous generation first
        if let Some(doc) = document_id {
            report.replaced_units = self.store.delete_document(agent_id, doc)?;
            if !report.replaced_units.is_empty() {
                debug!(
                    agent = agent_id,
                    document = doc,
                    replaced = report.replaced_units.len(),
                    "document upsert replaced prior units"
                );
            }
        }

        let facts = self
            .extractor
            .extract(content)
            .await
            .map_err(MemoryError::ExtractorUnavailable)?;

        for fact in facts {
            let outcome = self
                .ingest_fact(agent_id, &fact, event_date, document_id)
                .await;
            report.outcomes.push(match outcome {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(agent = agent_id, %error, "fact failed during ingest");
                    FactOutcome::Failed {
                        text: fact.text,
                        error,
                    }
                }
            });
        }

        // Visibility fence: retrieval must observe this batch on return
        self.store.commit()?;

        info!(
            agent = agent_id,
            facts = report.outcomes.len(),
            failed = report.failed_count(),
            "ingest complete"
        );
        Ok(report)
    }

    async fn ingest_fact(
        &self,
        agent_id: &str,
        fact: &ExtractedFact,
        event_date: DateTime<Utc>,
        document_id: Option<&str>,
    ) -> Result<FactOutcome> {
        if fact.text.trim().is_empty() {
            return Err(MemoryError::invalid_input("fact.text", "must not be empty"));
        }

        let mut embedding = self
            .embed_with_retry(&embedding_input(&fact.text, event_date))
            .await?;
        if embedding.len() != self.embedding_dimension {
            return Err(MemoryError::invalid_input(
                "embedding",
                format!(
                    "dimension mismatch: expected {}, got {}",
                    self.embedding_dimension,
                    embedding.len()
                ),
            ));
        }
        l2_normalize(&mut embedding);

        // Dedupe probe: exact text hash or near-identical embedding
        if let Some(existing) = self.store.find_duplicate(agent_id, &fact.text)? {
            debug!(agent = agent_id, unit = %existing, "dedupe: exact text match");
            return Ok(FactOutcome::Deduplicated(existing));
        }
        let near = self.store.vector_knn(
            agent_id,
            Some(fact.fact_type),
            &embedding,
            1,
            self.dedupe_threshold,
        )?;
        if let Some((existing, similarity)) = near.first() {
            debug!(
                agent = agent_id,
                unit = %existing,
                similarity,
                "dedupe: near-identical embedding"
            );
            return Ok(FactOutcome::Deduplicated(*existing));
        }

        // Resolve mentions; earlier resolutions feed later co-occurrence
        let mut entity_ids: Vec<EntityId> = Vec::with_capacity(fact.mentions.len());
        for mention in &fact.mentions {
            let resolution = self.resolver.resolve(
                agent_id,
                &mention.surface,
                mention.kind,
                &entity_ids,
                event_date,
            )?;
            let id = resolution.entity_id();
            if !entity_ids.contains(&id) {
                entity_ids.push(id);
            }
        }

        let unit = MemoryUnit {
            id: UnitId::new(),
            agent_id: agent_id.to_string(),
            text: fact.text.clone(),
            fact_type: fact.fact_type,
            event_date,
            created_at: Utc::now(),
            embedding,
            access_count: 0,
            context: None,
            document_id: document_id.map(str::to_string),
        };

        self.store.insert_unit(&unit, &entity_ids)?;

        // Linking is best-effort: a cancellation or failure here leaves an
        // inserted, retrievable unit with no links
        if let Err(error) = self.link_builder.build(&unit, &entity_ids) {
            warn!(unit = %unit.id, %error, "link construction failed; unit kept");
        }

        Ok(FactOutcome::Inserted(unit.id))
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_err = None;
        for attempt in 0..EMBED_MAX_ATTEMPTS {
            match self.embedder.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) => {
                    warn!(attempt = attempt + 1, "embedding attempt failed: {err}");
                    last_err = Some(err);
                    if attempt + 1 < EMBED_MAX_ATTEMPTS {
                        let backoff = EMBED_RETRY_BACKOFF_MS << attempt;
                        tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                    }
                }
            }
        }
        Err(MemoryError::EmbeddingUnavailable(last_err.unwrap_or_else(
            || anyhow::anyhow!("embedder returned no error detail"),
        )))
    }
}

/// Text augmented with a human-readable event date, as fed to the embedder
///
/// Keeping the date in the embedded text lets the vector space separate
/// "quit smoking in 2023" from "quit smoking in 2025".
pub fn embedding_input(text: &str, event_date: DateTime<Utc>) -> String {
    format!("[Date: {}] {}", event_date.format("%B %-d, %Y"), text)
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_embedding_input_format() {
        let date = chrono::Utc.with_ymd_and_hms(2023, 4, 10, 12, 0, 0).unwrap();
        let input = embedding_input("Alice joined the team.", date);
        assert_eq!(input, "[Date: April 10, 2023] Alice joined the team.");
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
