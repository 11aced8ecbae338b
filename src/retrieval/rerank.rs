//! Cross-encoder reranker client
//!
//! Each candidate is presented to the cross-encoder as its text prefixed
//! with the unit's event date in both human and ISO form (plus any stored
//! context), so the model can down-rank facts whose dates contradict a
//! temporal query. Raw scores pass through a logistic transform; ordering
//! is stable on (score desc, id asc).
//!
//! A reranker failure is a degradation, not an error: the caller keeps the
//! fused order and tags the trace.

use std::sync::Arc;

use tracing::warn;

use crate::providers::Reranker;
use crate::types::MemoryUnit;

use super::ScoredUnit;

pub struct RerankClient {
    reranker: Arc<dyn Reranker>,
}

impl RerankClient {
    pub fn new(reranker: Arc<dyn Reranker>) -> Self {
        Self { reranker }
    }

    /// Build the cross-encoder input for one unit
    ///
    /// `"[Date: <Month D, YYYY> (YYYY-MM-DD)] " + context prefix + text`
    pub fn input_text(unit: &MemoryUnit) -> String {
        let date = unit.event_date;
        let mut input = format!(
            "[Date: {} ({})] ",
            date.format("%B %-d, %Y"),
            date.format("%Y-%m-%d")
        );
        if let Some(context) = &unit.context {
            input.push_str(context);
            input.push_str(": ");
        }
        input.push_str(&unit.text);
        input
    }

    /// Score and reorder candidates in place
    ///
    /// On success every candidate carries a calibrated `rerank_score` and
    /// the vector is sorted (score desc, id asc). On failure the input
    /// order is left untouched and `Err` tells the caller to degrade.
    pub async fn rerank(&self, query: &str, candidates: &mut [ScoredUnit]) -> anyhow::Result<()> {
        if candidates.is_empty() {
            return Ok(());
        }

        let documents: Vec<String> = candidates
            .iter()
            .map(|c| Self::input_text(&c.unit))
            .collect();

        let raw = self.reranker.score(query, &documents).await?;
        if raw.len() != candidates.len() {
            warn!(
                expected = candidates.len(),
                got = raw.len(),
                "reranker returned wrong score count"
            );
            anyhow::bail!("score count mismatch");
        }

        for (candidate, raw_score) in candidates.iter_mut().zip(raw) {
            let calibrated = logistic(raw_score);
            candidate.rerank_score = Some(calibrated);
            candidate.score = calibrated;
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.unit.id.cmp(&b.unit.id))
        });
        Ok(())
    }
}

/// Standard logistic calibration of a raw cross-encoder score
fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
