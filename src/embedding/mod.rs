//! Embedding interface and vector math
//!
//! The engine never generates catalog embeddings itself; it consumes vectors
//! produced by an external `embed()` service. The `Embedder` trait is that
//! seam, with deterministic local backends standing in for the service, and
//! an optional SQLite cache in front of it.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod backends;
pub mod cache;

// Re-exports
pub use backends::*;
pub use cache::*;

/// Represents an embedding vector
pub type Embedding = Vec<f32>;

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name or path
    pub model_name: String,
    /// Whether to L2-normalize embeddings
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "token-embedder".to_string(),
            normalize: true,
        }
    }
}

/// Trait for embedding models
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed multiple texts in batch
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Euclidean norm, accumulated in f64
pub fn magnitude(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| {
            let x = x as f64;
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

/// Normalize an embedding vector (L2 normalization)
pub fn normalize_embedding(embedding: &mut Embedding) {
    let norm = magnitude(embedding);

    if norm > 0.0 {
        for val in embedding.iter_mut() {
            *val = (*val as f64 / norm) as f32;
        }
    }
}

/// Cosine similarity in [-1, 1].
///
/// Returns `None` when the lengths differ or either vector has zero
/// magnitude, since the measure is undefined there.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum();

    Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Map a cosine in [-1, 1] onto [0, 1]
pub fn rescale_cosine(cos: f64) -> f32 {
    ((cos.clamp(-1.0, 1.0) + 1.0) / 2.0) as f32
}
