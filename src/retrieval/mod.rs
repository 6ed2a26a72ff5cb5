//! Retrieval engines
//!
//! Exact cosine similarity over the embedding store (dense), keyword overlap
//! over item metadata (sparse), and weighted fusion of the two (hybrid).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub mod dense;
pub mod hybrid;
pub mod sparse;

// Re-exports
pub use dense::*;
pub use hybrid::*;
pub use sparse::*;

/// Score of one item from a single signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemScore {
    pub item_id: String,
    /// Relevance in [0, 1] (higher is better)
    pub score: f32,
}

/// Fused ranking entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub item_id: String,
    /// Rescaled cosine similarity, 0 when the item had no vector
    pub semantic_score: f32,
    /// Fraction of query tokens matched
    pub keyword_score: f32,
    /// Weighted sum of the two signals
    pub combined_score: f32,
}

/// Descending score, ascending id
pub(crate) fn by_score_then_id(a_score: f32, a_id: &str, b_score: f32, b_id: &str) -> Ordering {
    b_score.total_cmp(&a_score).then_with(|| a_id.cmp(b_id))
}

pub(crate) fn sort_item_scores(scores: &mut [ItemScore]) {
    scores.sort_by(|a, b| by_score_then_id(a.score, &a.item_id, b.score, &b.item_id));
}

/// Lowercase and split on every non-alphanumeric character
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}
