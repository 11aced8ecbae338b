//! Linear ranking weights
//!
//! Callers wanting a combined score alongside reranker output get
//! final = w_a * activation + w_s * semantic_sim + w_r * recency
//!       + w_f * frequency
//! with a one-year logarithmic half-life on recency and log-saturating
//! frequency (10 accesses reach the cap).

use chrono::{DateTime, Utc};

use crate::config::RankingWeights;
use crate::constants::RANKING_RECENCY_SCALE_DAYS;

/// recency = 1 / (1 + ln(1 + days_since_event / 365))
pub fn recency_score(event_date: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let days = ((now - event_date).num_seconds().max(0) as f64) / 86_400.0;
    (1.0 / (1.0 + (1.0 + days / RANKING_RECENCY_SCALE_DAYS).ln())) as f32
}

/// frequency = min(1, ln(access_count + 1) / ln(10))
pub fn frequency_score(access_count: u64) -> f32 {
    (((access_count as f64) + 1.0).ln() / 10f64.ln()).min(1.0) as f32
}

pub fn final_weight(
    weights: &RankingWeights,
    activation: f32,
    semantic_sim: f32,
    recency: f32,
    frequency: f32,
) -> f32 {
    weights.activation * activation
        + weights.semantic * semantic_sim
        + weights.recency * recency
        + weights.frequency * frequency
}
