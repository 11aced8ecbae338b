//! BM25 full-text index over unit text
//!
//! Backed by tantivy with the `en_stem` analyzer (simple tokenization,
//! lowercasing, Porter stemming), so posting lists hold stemmed English
//! tokens. Queries arrive pre-stemmed from the keyword retriever and are
//! matched as raw terms combined with mandatory agent and optional
//! fact_type filters.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::info;

use crate::constants::BM25_WRITER_HEAP;
use crate::errors::Result;
use crate::types::{FactType, UnitId};

/// BM25 index over memory unit text
pub struct FulltextIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    id_field: Field,
    agent_field: Field,
    fact_type_field: Field,
    text_field: Field,
}

impl FulltextIndex {
    /// Create or open the index at the given path
    pub fn new(path: &Path) -> Result<Self> {
        let mut schema_builder = Schema::builder();

        // Unit ID (stored, not tokenized)
        let id_field = schema_builder.add_text_field("id", STRING | STORED);

        // Partition fields (raw terms, used as filters)
        let agent_field = schema_builder.add_text_field("agent_id", STRING);
        let fact_type_field = schema_builder.add_text_field("fact_type", STRING);

        // Narrative fact text, stemmed for BM25
        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);
        let text_field = schema_builder.add_text_field("text", text_options);

        let schema = schema_builder.build();

        std::fs::create_dir_all(path)?;
        let dir = tantivy::directory::MmapDirectory::open(path)
            .map_err(|e| crate::errors::MemoryError::StoreUnavailable(e.to_string()))?;

        let index = if Index::exists(&dir)? {
            Index::open(dir)?
        } else {
            Index::create_in_dir(path, schema.clone())?
        };

        let writer = index.writer(BM25_WRITER_HEAP)?;

        let reader = index
            .reader_builder()
            .reload_policy(tantivy::ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        info!("BM25 index ready at {:?}", path);

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            id_field,
            agent_field,
            fact_type_field,
            text_field,
        })
    }

    /// Add a unit's text to the index
    pub fn add(&self, id: &UnitId, agent_id: &str, fact_type: FactType, text: &str) -> Result<()> {
        let writer = self.writer.write();

        // Unit text is immutable; a re-add replaces any stale document
        let id_term = Term::from_field_text(self.id_field, &id.to_string());
        writer.delete_term(id_term);

        let mut doc = TantivyDocument::new();
        doc.add_text(self.id_field, id.to_string());
        doc.add_text(self.agent_field, agent_id);
        doc.add_text(self.fact_type_field, fact_type.as_str());
        doc.add_text(self.text_field, text);
        writer.add_document(doc)?;

        Ok(())
    }

    /// Remove one unit from the index
    pub fn remove(&self, id: &UnitId) -> Result<()> {
        let writer = self.writer.write();
        let id_term = Term::from_field_text(self.id_field, &id.to_string());
        writer.delete_term(id_term);
        Ok(())
    }

    /// Remove every document of an agent
    pub fn remove_agent(&self, agent_id: &str) -> Result<()> {
        let writer = self.writer.write();
        let term = Term::from_field_text(self.agent_field, agent_id);
        writer.delete_term(term);
        Ok(())
    }

    /// Commit pending changes and reload the reader so they are visible to
    /// the next search. Called once per ingest batch as the visibility
    /// fence.
    pub fn commit_and_reload(&self) -> Result<()> {
        {
            let mut writer = self.writer.write();
            writer.commit()?;
        }
        self.reader.reload()?;
        Ok(())
    }

    /// BM25 search over pre-stemmed query tokens
    ///
    /// Token matches are OR-combined and scored; agent and fact_type are
    /// hard filters. Returns (id, score) ordered score desc, id asc.
    pub fn search(
        &self,
        agent_id: &str,
        fact_type: Option<FactType>,
        query_tokens: &[String],
        k: usize,
    ) -> Result<Vec<(UnitId, f32)>> {
        if query_tokens.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let token_queries: Vec<(Occur, Box<dyn Query>)> = query_tokens
            .iter()
            .map(|token| {
                let term = Term::from_field_text(self.text_field, token);
                let q: Box<dyn Query> = Box::new(TermQuery::new(
                    term,
                    IndexRecordOption::WithFreqsAndPositions,
                ));
                (Occur::Should, q)
            })
            .collect();

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.agent_field, agent_id),
                    IndexRecordOption::Basic,
                )),
            ),
            (Occur::Must, Box::new(BooleanQuery::new(token_queries))),
        ];
        if let Some(ft) = fact_type {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fact_type_field, ft.as_str()),
                    IndexRecordOption::Basic,
                )),
            ));
        }

        let query = BooleanQuery::new(clauses);
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;

        let mut results: Vec<(UnitId, f32)> = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            if let Some(id_value) = doc.get_first(self.id_field) {
                if let Some(id_str) = id_value.as_str() {
                    if let Ok(raw) = uuid::Uuid::parse_str(id_str) {
                        results.push((UnitId(raw), score));
                    }
                }
            }
        }

        // Stable order: score desc, id asc
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(results)
    }

    /// Document count (diagnostics)
    pub fn len(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stem query text the way the index analyzer stems documents
    ///
    /// Runs the field's own tokenizer so query terms and posting lists
    /// always agree, whatever analyzer the schema declares.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let Ok(mut analyzer) = self.index.tokenizer_for_field(self.text_field) else {
            return Vec::new();
        };
        let mut tokens = Vec::new();
        let mut stream = analyzer.token_stream(text);
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        tokens
    }
}
