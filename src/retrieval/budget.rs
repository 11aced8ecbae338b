//! Token-budget filtering
//!
//! Result text is counted with the cl100k_base BPE (GPT-4 compatible) and
//! admitted in rank order until the cumulative count over `text` alone
//! would exceed the ceiling. The filter stops at the first overflow rather
//! than skipping ahead: a caller reading top-down should never find a gap.

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::errors::{MemoryError, Result};

/// Shared tokenizer for budget accounting
///
/// Loading the BPE ranks is expensive; the engine builds one of these at
/// startup and reuses it for every query.
pub struct TokenBudget {
    bpe: CoreBPE,
}

impl TokenBudget {
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base()
            .map_err(|e| MemoryError::StoreUnavailable(format!("tokenizer load: {e}")))?;
        Ok(Self { bpe })
    }

    /// Exact BPE token count for a text
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Admit items in order while the cumulative token count of their text
    /// stays within `max_tokens`; stop at the first overflow.
    ///
    /// Returns the admitted items paired with their token counts.
    pub fn filter<T>(
        &self,
        items: Vec<T>,
        max_tokens: usize,
        text_of: impl Fn(&T) -> &str,
    ) -> Vec<(T, usize)> {
        let mut admitted = Vec::new();
        let mut used = 0usize;

        for item in items {
            let tokens = self.count(text_of(&item));
            if used + tokens > max_tokens {
                break;
            }
            used += tokens;
            admitted.push((item, tokens));
        }

        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_is_nonzero_for_text() {
        let budget = TokenBudget::new().unwrap();
        assert!(budget.count("Alice works at Google in Mountain View.") > 0);
        assert_eq!(budget.count(""), 0);
    }

    #[test]
    fn test_filter_respects_ceiling() {
        let budget = TokenBudget::new().unwrap();
        let items = vec!["one two three four five".to_string(); 10];
        let per_item = budget.count(&items[0]);

        let admitted = budget.filter(items, per_item * 3, |s| s.as_str());
        assert_eq!(admitted.len(), 3);
        let total: usize = admitted.iter().map(|(_, n)| n).sum();
        assert!(total <= per_item * 3);
    }

    #[test]
    fn test_filter_stops_at_first_overflow() {
        let budget = TokenBudget::new().unwrap();
        let long = "a detailed narrative fact with many words in it".to_string();
        let short = "ok".to_string();
        let long_tokens = budget.count(&long);

        // Budget fits the long item exactly; the next long item overflows
        // and the filter must not skip past it to admit the short one.
        let admitted = budget.filter(
            vec![long.clone(), long.clone(), short],
            long_tokens,
            |s| s.as_str(),
        );
        assert_eq!(admitted.len(), 1);
    }

    #[test]
    fn test_zero_budget_admits_nothing() {
        let budget = TokenBudget::new().unwrap();
        let admitted = budget.filter(vec!["text".to_string()], 0, |s| s.as_str());
        assert!(admitted.is_empty());
    }
}
