//! The engine runtime
//!
//! [`MemoryEngine`] is the single value owning everything with process
//! lifetime: the store, the four external collaborators, and the tokenizer
//! cache. Construct it once at startup, share it behind an `Arc`, drop it
//! on shutdown. There is no other global state in the crate.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::ingest::{IngestReport, Ingestor};
use crate::providers::{Embedder, FactExtractor, Reranker, TemporalParser};
use crate::retrieval::{Retriever, SearchOptions, SearchResponse};
use crate::store::{MemoryStore, VectorIndexConfig};
use crate::types::{MemoryUnit, UnitId};

/// The four opaque external services the engine depends on
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn FactExtractor>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
    pub temporal_parser: Arc<dyn TemporalParser>,
}

/// Long-term conversational memory engine
pub struct MemoryEngine {
    store: Arc<MemoryStore>,
    ingestor: Ingestor,
    retriever: Retriever,
    config: EngineConfig,
}

impl MemoryEngine {
    /// Open or create an engine at the given storage path
    pub fn new(path: &Path, config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        if collaborators.embedder.dimension() != config.embedding_dimension {
            return Err(crate::errors::MemoryError::invalid_input(
                "embedder",
                format!(
                    "embedder produces {}d vectors, config expects {}d",
                    collaborators.embedder.dimension(),
                    config.embedding_dimension
                ),
            ));
        }

        let vector_config = VectorIndexConfig {
            dimension: config.embedding_dimension,
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::new(path, vector_config)?);

        let ingestor = Ingestor::new(
            Arc::clone(&store),
            &config,
            Arc::clone(&collaborators.extractor),
            Arc::clone(&collaborators.embedder),
        );
        let retriever = Retriever::new(
            Arc::clone(&store),
            &config,
            Arc::clone(&collaborators.embedder),
            Arc::clone(&collaborators.reranker),
            Arc::clone(&collaborators.temporal_parser),
        )?;

        config.log();
        info!(path = %path.display(), "memory engine ready");

        Ok(Self {
            store,
            ingestor,
            retriever,
            config,
        })
    }

    /// Ingest content: extract facts, embed, dedupe, insert, link
    ///
    /// With a `document_id`, prior units of that document are replaced
    /// (upsert semantics). After this returns, retrieval observes the new
    /// units and their links.
    pub async fn ingest(
        &self,
        agent_id: &str,
        content: &str,
        event_date: DateTime<Utc>,
        document_id: Option<&str>,
    ) -> Result<IngestReport> {
        self.ingestor
            .ingest(agent_id, content, event_date, document_id)
            .await
    }

    /// Retrieve the most relevant facts for a query
    pub async fn search(
        &self,
        agent_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse> {
        self.retriever.search(agent_id, query, options).await
    }

    /// Search with default options
    pub async fn search_default(&self, agent_id: &str, query: &str) -> Result<SearchResponse> {
        self.search(agent_id, query, &SearchOptions::default()).await
    }

    pub fn get_unit(&self, id: &UnitId) -> Result<MemoryUnit> {
        self.store.get_unit(id)
    }

    /// Delete a document and everything hanging off its units
    pub fn delete_document(&self, agent_id: &str, document_id: &str) -> Result<Vec<UnitId>> {
        self.store.delete_document(agent_id, document_id)
    }

    /// Delete an agent's entire memory
    pub fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.store.delete_agent(agent_id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct store access for diagnostics and tests
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}
