//! Sparse retrieval
//!
//! Recall-oriented keyword overlap: the fraction of distinct query tokens
//! found among an item's name, description and category tokens.

use crate::catalog::{EmbeddingStore, Item};
use crate::config::KeywordConfig;
use crate::retrieval::{sort_item_scores, tokenize, ItemScore};
use std::collections::{BTreeSet, HashSet};

/// Keyword relevance scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer {
    config: KeywordConfig,
}

impl KeywordScorer {
    pub fn new(config: KeywordConfig) -> Self {
        Self { config }
    }

    /// Distinct query tokens that count toward the score
    pub fn query_tokens(&self, query: &str) -> BTreeSet<String> {
        tokenize(query)
            .into_iter()
            .filter(|token| token.chars().count() >= self.config.min_token_len)
            .collect()
    }

    /// Score one item against `query`, in [0, 1]. An empty query scores 0.
    pub fn score(&self, query: &str, item: &Item) -> f32 {
        self.score_tokens(&self.query_tokens(query), item)
    }

    /// Score every item, keeping only nonzero scores, best first
    pub fn score_all(&self, query: &str, store: &EmbeddingStore) -> Vec<ItemScore> {
        let query_tokens = self.query_tokens(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: Vec<ItemScore> = store
            .all_items()
            .iter()
            .filter_map(|item| {
                let score = self.score_tokens(&query_tokens, item);
                (score > 0.0).then(|| ItemScore {
                    item_id: item.id.clone(),
                    score,
                })
            })
            .collect();

        sort_item_scores(&mut scores);

        tracing::debug!(
            "Keyword pass matched {} of {} items",
            scores.len(),
            store.len()
        );
        scores
    }

    fn score_tokens(&self, query_tokens: &BTreeSet<String>, item: &Item) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let item_tokens: HashSet<String> = item
            .keyword_fields()
            .iter()
            .flat_map(|field| tokenize(field))
            .collect();

        let matched = query_tokens
            .iter()
            .filter(|token| self.matches(token, &item_tokens))
            .count();

        matched as f32 / query_tokens.len() as f32
    }

    fn matches(&self, token: &str, item_tokens: &HashSet<String>) -> bool {
        item_tokens.contains(token)
            || (self.config.substring_match
                && item_tokens.iter().any(|candidate| candidate.contains(token)))
    }
}
