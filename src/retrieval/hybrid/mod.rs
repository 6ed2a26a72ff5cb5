//! Hybrid retrieval
//!
//! Weighted fusion of the dense and sparse signals into one ranking.

use crate::catalog::{EmbeddingStore, Modality};
use crate::config::{KeywordConfig, SearchOptions};
use crate::embedding::Embedding;
use crate::error::{FindabilityError, Result};
use crate::retrieval::{by_score_then_id, KeywordScorer, ScoredResult, SimilarityEngine};
use std::collections::BTreeMap;

/// A search request. The vector comes from the external embedding service;
/// the text is only used for keyword scoring in text mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub text: Option<String>,
    pub vector: Option<Embedding>,
}

impl Query {
    /// Text query with its embedding
    pub fn text(text: impl Into<String>, vector: Embedding) -> Self {
        Self {
            text: Some(text.into()),
            vector: Some(vector),
        }
    }

    /// Vector-only query, for pure semantic ranking in either modality
    pub fn vector(vector: Embedding) -> Self {
        Self {
            text: None,
            vector: Some(vector),
        }
    }

    /// Image query; images carry no text to match keywords against
    pub fn image(vector: Embedding) -> Self {
        Self::vector(vector)
    }

    /// Keyword-only query, usable when the semantic weight is zero
    pub fn keywords(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            vector: None,
        }
    }
}

/// Fuses similarity and keyword scores over one embedding store
#[derive(Debug, Clone, Copy)]
pub struct HybridRanker<'a> {
    store: &'a EmbeddingStore,
    keyword: KeywordScorer,
}

impl<'a> HybridRanker<'a> {
    pub fn new(store: &'a EmbeddingStore, keyword: KeywordConfig) -> Self {
        Self {
            store,
            keyword: KeywordScorer::new(keyword),
        }
    }

    /// Rank items for `query`.
    ///
    /// `combined = w_semantic * semantic + w_keyword * keyword`. A signal with
    /// weight 0 is not computed at all. Keyword scoring only runs in text
    /// mode. An item missing from one pass scores 0 there.
    pub fn rank(
        &self,
        query: &Query,
        modality: Modality,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredResult>> {
        let weights = options.weights;
        weights.validate()?;
        if options.top_k == 0 {
            return Err(FindabilityError::invalid_query("top_k must be > 0"));
        }

        // item id -> (semantic, keyword)
        let mut signals: BTreeMap<String, (f32, f32)> = BTreeMap::new();

        if weights.semantic > 0.0 {
            let vector = query.vector.as_deref().ok_or_else(|| {
                FindabilityError::invalid_query("semantic weight > 0 requires a query vector")
            })?;
            for scored in SimilarityEngine::new(self.store).score(vector, modality)? {
                signals.entry(scored.item_id).or_default().0 = scored.score;
            }
        }

        if weights.keyword > 0.0 && modality == Modality::Text {
            match query.text.as_deref() {
                Some(text) => {
                    for scored in self.keyword.score_all(text, self.store) {
                        signals.entry(scored.item_id).or_default().1 = scored.score;
                    }
                }
                None => tracing::debug!("Keyword weight set but query has no text"),
            }
        }

        let mut results: Vec<ScoredResult> = signals
            .into_iter()
            .map(|(item_id, (semantic_score, keyword_score))| ScoredResult {
                combined_score: weights.semantic * semantic_score
                    + weights.keyword * keyword_score,
                item_id,
                semantic_score,
                keyword_score,
            })
            .collect();

        results.sort_by(|a, b| {
            by_score_then_id(a.combined_score, &a.item_id, b.combined_score, &b.item_id)
        });
        let candidates = results.len();
        results.truncate(options.top_k);

        tracing::debug!(
            "Ranked {} candidates for {} query, returning {}",
            candidates,
            modality,
            results.len()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Item;
    use crate::config::SearchWeights;
    use proptest::prelude::*;

    fn store() -> EmbeddingStore {
        EmbeddingStore::new(vec![
            Item::new("A", "Hydraulic Pump").with_text_embedding(vec![1.0, 0.0]),
            Item::new("B", "Pump Seal").with_text_embedding(vec![0.0, 1.0]),
            Item::new("C", "Caution Label Yellow"),
        ])
        .unwrap()
    }

    fn options(semantic: f32, keyword: f32, top_k: usize) -> SearchOptions {
        SearchOptions::new(SearchWeights::new(semantic, keyword).unwrap(), top_k).unwrap()
    }

    #[test]
    fn test_semantic_scenario() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let results = ranker
            .rank(
                &Query::vector(vec![1.0, 0.0]),
                Modality::Text,
                &options(1.0, 0.0, 10),
            )
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item_id, "A");
        assert_eq!(results[0].semantic_score, 1.0);
        assert_eq!(results[1].item_id, "B");
        assert_eq!(results[1].semantic_score, 0.5);
    }

    #[test]
    fn test_keyword_only_item_is_included() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let results = ranker
            .rank(
                &Query::text("yellow caution label", vec![1.0, 0.0]),
                Modality::Text,
                &options(0.5, 0.5, 10),
            )
            .unwrap();

        let c = results.iter().find(|r| r.item_id == "C").unwrap();
        assert_eq!(c.semantic_score, 0.0);
        assert_eq!(c.keyword_score, 1.0);
        assert_eq!(c.combined_score, 0.5);

        // A: 0.5 * 1.0 + 0; C: 0 + 0.5 * 1.0; tie broken by id
        assert_eq!(results[0].item_id, "A");
        assert_eq!(results[1].item_id, "C");
        assert_eq!(results[2].item_id, "B");
    }

    #[test]
    fn test_unnormalized_weights() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let results = ranker
            .rank(
                &Query::text("seal", vec![1.0, 0.0]),
                Modality::Text,
                &options(1.0, 2.0, 10),
            )
            .unwrap();

        assert_eq!(results[0].item_id, "B");
        assert_eq!(results[0].combined_score, 2.5);
    }

    #[test]
    fn test_keyword_ignored_in_image_mode() {
        let store = EmbeddingStore::new(vec![
            Item::new("A", "Pump").with_image_embedding(vec![0.0, 1.0]),
            Item::new("B", "Label").with_image_embedding(vec![1.0, 0.0]),
        ])
        .unwrap();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let query = Query {
            text: Some("pump".to_string()),
            vector: Some(vec![1.0, 0.0]),
        };
        let results = ranker
            .rank(&query, Modality::Image, &options(0.5, 0.5, 10))
            .unwrap();

        assert!(results.iter().all(|r| r.keyword_score == 0.0));
        assert_eq!(results[0].item_id, "B");
    }

    #[test]
    fn test_top_k_truncates_and_small_sets_are_fine() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());
        let query = Query::text("pump", vec![1.0, 0.0]);

        let one = ranker.rank(&query, Modality::Text, &options(0.7, 0.3, 1)).unwrap();
        assert_eq!(one.len(), 1);

        let all = ranker.rank(&query, Modality::Text, &options(0.7, 0.3, 50)).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_keyword_only_query_without_vector() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let results = ranker
            .rank(&Query::keywords("pump"), Modality::Text, &options(0.0, 1.0, 10))
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);

        let missing_vector =
            ranker.rank(&Query::keywords("pump"), Modality::Text, &options(1.0, 1.0, 10));
        assert!(matches!(missing_vector, Err(FindabilityError::InvalidQuery(_))));
    }

    #[test]
    fn test_invalid_inputs_abort() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let zero = ranker.rank(
            &Query::text("pump", vec![0.0, 0.0]),
            Modality::Text,
            &options(0.7, 0.3, 5),
        );
        assert!(matches!(zero, Err(FindabilityError::InvalidQuery(_))));

        let bad_weights = SearchOptions {
            weights: SearchWeights {
                semantic: -1.0,
                keyword: 1.0,
            },
            top_k: 5,
        };
        let result = ranker.rank(&Query::keywords("pump"), Modality::Text, &bad_weights);
        assert!(matches!(result, Err(FindabilityError::InvalidQuery(_))));

        let huge_weights = SearchOptions {
            weights: SearchWeights {
                semantic: 3e38,
                keyword: 3e38,
            },
            top_k: 5,
        };
        let result = ranker.rank(
            &Query::text("pump", vec![1.0, 0.0]),
            Modality::Text,
            &huge_weights,
        );
        assert!(matches!(result, Err(FindabilityError::InvalidQuery(_))));
    }

    #[test]
    fn test_no_matches_is_empty_not_error() {
        let store = store();
        let ranker = HybridRanker::new(&store, KeywordConfig::default());

        let results = ranker
            .rank(&Query::keywords("forklift"), Modality::Text, &options(0.0, 1.0, 5))
            .unwrap();
        assert!(results.is_empty());
    }

    proptest! {
        #[test]
        fn prop_pure_semantic_matches_similarity_engine(
            vectors in prop::collection::vec(prop::collection::vec(-1.0_f32..1.0, 4), 1..24),
            query in prop::collection::vec(-1.0_f32..1.0, 4),
        ) {
            prop_assume!(crate::embedding::magnitude(&query) > 1e-3);
            let items = vectors
                .into_iter()
                .enumerate()
                .map(|(i, v)| Item::new(format!("i{}", i), "pump").with_text_embedding(v))
                .collect();
            let store = EmbeddingStore::new(items).unwrap();

            let expected = SimilarityEngine::new(&store).score(&query, Modality::Text).unwrap();
            let ranked = HybridRanker::new(&store, KeywordConfig::default())
                .rank(
                    &Query::text("pump", query.clone()),
                    Modality::Text,
                    &SearchOptions::new(SearchWeights::semantic_only(), 1000).unwrap(),
                )
                .unwrap();

            prop_assert_eq!(ranked.len(), expected.len());
            for (r, e) in ranked.iter().zip(expected.iter()) {
                prop_assert_eq!(&r.item_id, &e.item_id);
                prop_assert_eq!(r.semantic_score, e.score);
                prop_assert_eq!(r.keyword_score, 0.0);
            }
        }

        #[test]
        fn prop_rank_is_sorted_and_idempotent(
            names in prop::collection::vec("(pump|seal|label|kit)( (pump|seal|label|kit)){0,2}", 1..16),
            text in "(pump|seal|label|kit)( (pump|seal|label|kit)){0,2}",
            semantic in 0.0_f32..2.0,
            keyword in 0.01_f32..2.0,
        ) {
            let items = names
                .into_iter()
                .enumerate()
                .map(|(i, name)| {
                    let v = vec![(i % 3) as f32 + 0.5, (i % 5) as f32 - 2.0];
                    Item::new(format!("{:03}", i), name).with_text_embedding(v)
                })
                .collect();
            let store = EmbeddingStore::new(items).unwrap();
            let ranker = HybridRanker::new(&store, KeywordConfig::default());
            let query = Query::text(text, vec![1.0, 1.0]);
            let opts = SearchOptions::new(SearchWeights::new(semantic, keyword).unwrap(), 10).unwrap();

            let first = ranker.rank(&query, Modality::Text, &opts).unwrap();
            let second = ranker.rank(&query, Modality::Text, &opts).unwrap();
            prop_assert_eq!(&first, &second);

            for pair in first.windows(2) {
                prop_assert!(pair[0].combined_score >= pair[1].combined_score);
                if pair[0].combined_score == pair[1].combined_score {
                    prop_assert!(pair[0].item_id < pair[1].item_id);
                }
            }
        }
    }
}
