//! Local embedding backends
//!
//! Deterministic stand-ins for the external embedding service. `token` gives
//! lexically meaningful vectors (shared tokens point the same way), `mock`
//! gives hash-seeded noise for tests.

use crate::embedding::{normalize_embedding, Embedder, Embedding, EmbeddingConfig};
use crate::error::{FindabilityError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Hash-seeded noise vectors. Same text, same vector; unrelated texts are
/// near-orthogonal in high dimensions.
pub struct MockEmbedder {
    config: EmbeddingConfig,
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(config: EmbeddingConfig, dimension: usize) -> Self {
        Self { config, dimension }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut rng = StdRng::seed_from_u64(text_seed(text));
        let mut embedding: Embedding = (0..self.dimension)
            .map(|_| rng.gen_range(-0.5_f32..0.5))
            .collect();

        if self.config.normalize {
            normalize_embedding(&mut embedding);
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

fn text_seed(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Hashed bag-of-tokens embedder.
///
/// Tokens are split the same way the keyword scorer splits them, so an item
/// and a query sharing words land close together.
pub struct TokenEmbedder {
    config: EmbeddingConfig,
    dimension: usize,
}

impl TokenEmbedder {
    /// Create a new token-based embedder
    pub fn new(config: EmbeddingConfig, dimension: usize) -> Self {
        Self { config, dimension }
    }

    fn generate_embedding(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0; self.dimension];

        let tokens = crate::retrieval::tokenize(text);
        if tokens.is_empty() {
            return embedding;
        }

        // Term frequency per hashed bucket
        let weight = 1.0 / tokens.len() as f32;
        for token in &tokens {
            embedding[(text_seed(token) % self.dimension as u64) as usize] += weight;
        }

        if self.config.normalize {
            normalize_embedding(&mut embedding);
        }
        embedding
    }
}

impl Embedder for TokenEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.generate_embedding(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Create an embedder based on backend name
pub fn create_embedder(
    backend: &str,
    config: EmbeddingConfig,
    dimension: usize,
) -> Result<Arc<dyn Embedder>> {
    if dimension == 0 {
        return Err(FindabilityError::invalid_query(
            "embedding dimension must be > 0",
        ));
    }

    match backend {
        "mock" => Ok(Arc::new(MockEmbedder::new(config, dimension))),
        "token" => Ok(Arc::new(TokenEmbedder::new(config, dimension))),
        _ => {
            tracing::warn!("Unknown backend '{}', using token-based embedder", backend);
            Ok(Arc::new(TokenEmbedder::new(config, dimension)))
        }
    }
}
