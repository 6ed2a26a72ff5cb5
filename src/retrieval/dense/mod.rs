//! Dense retrieval
//!
//! Brute-force cosine similarity between a query vector and every stored
//! vector of one modality.

use crate::catalog::{EmbeddingStore, Modality};
use crate::embedding::{cosine_similarity, magnitude, rescale_cosine};
use crate::error::{FindabilityError, Result};
use crate::retrieval::{sort_item_scores, ItemScore};

/// Exact similarity scorer over an embedding store
#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine<'a> {
    store: &'a EmbeddingStore,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(store: &'a EmbeddingStore) -> Self {
        Self { store }
    }

    /// Score every item that has a `modality` vector.
    ///
    /// Similarity is rescaled from [-1, 1] to [0, 1]. Items without a vector
    /// are left out. Output is ordered by similarity descending, then id.
    pub fn score(&self, query: &[f32], modality: Modality) -> Result<Vec<ItemScore>> {
        validate_query_vector(query)?;

        let Some(dimension) = self.store.dimension(modality) else {
            tracing::debug!("No {} embeddings in store", modality);
            return Ok(Vec::new());
        };
        if dimension != query.len() {
            return Err(FindabilityError::invalid_query(format!(
                "query vector has dimension {}, {} embeddings have {}",
                query.len(),
                modality,
                dimension
            )));
        }

        let mut scores: Vec<ItemScore> = self
            .store
            .embedded(modality)
            .filter_map(|(item, vector)| {
                cosine_similarity(query, vector).map(|cos| ItemScore {
                    item_id: item.id.clone(),
                    score: rescale_cosine(cos),
                })
            })
            .collect();

        sort_item_scores(&mut scores);

        tracing::debug!("Similarity pass scored {} {} vectors", scores.len(), modality);
        Ok(scores)
    }
}

/// Reject vectors for which cosine similarity is undefined
pub fn validate_query_vector(query: &[f32]) -> Result<()> {
    if query.is_empty() {
        return Err(FindabilityError::invalid_query("query vector is empty"));
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(FindabilityError::invalid_query(
            "query vector contains non-finite values",
        ));
    }
    if magnitude(query) == 0.0 {
        return Err(FindabilityError::invalid_query(
            "query vector has zero magnitude",
        ));
    }
    Ok(())
}
