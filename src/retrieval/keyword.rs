//! Keyword retrieval path: BM25 over stemmed query terms
//!
//! Query text is lowercased, split on non-alphanumerics, stripped of stop
//! words, and Porter-stemmed with the same English stemmer the index
//! analyzer uses, so query terms hit the posting lists directly. A query
//! with nothing left after stop-word removal returns empty.

use rust_stemmers::{Algorithm, Stemmer};

use crate::errors::Result;
use crate::store::MemoryStore;
use crate::types::{FactType, UnitId};

/// English stop words dropped from queries before stemming
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "did", "do", "does", "for", "from",
    "had", "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "me", "my", "no", "not", "of", "on", "or", "our", "she", "so", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "to", "was", "we", "were", "what", "when", "where",
    "which", "who", "why", "will", "with", "you", "your",
];

/// Stemmed, stop-worded query tokens
pub fn query_tokens(query: &str) -> Vec<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(|t| stemmer.stem(t).to_string())
        .collect()
}

/// BM25 search capped at thinking_budget
pub fn query(
    store: &MemoryStore,
    agent_id: &str,
    fact_type: Option<FactType>,
    query_text: &str,
    thinking_budget: usize,
) -> Result<Vec<(UnitId, f32)>> {
    let tokens = query_tokens(query_text);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    store.bm25_search(agent_id, fact_type, &tokens, thinking_budget)
}
