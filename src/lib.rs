//! # Findability
//!
//! Product retrieval and recommendation over a precomputed catalog.
//!
//! ## Overview
//!
//! Findability serves two kinds of questions against a product catalog whose
//! items carry text and image embeddings produced by an external service:
//!
//! - Search: rank items by cosine similarity to a query vector, optionally
//!   fused with a keyword-overlap score for text queries
//! - Recommendation: list items frequently bought together with a given item,
//!   from a weighted co-purchase graph
//!
//! ## Architecture
//!
//! - `catalog` - Items, modalities, and the embedding store
//! - `embedding` - Embedder interface, vector math, and the SQLite cache
//! - `retrieval` - Dense, sparse, and hybrid ranking
//! - `recommend` - Co-purchase graph, CSV loading, and synthetic data
//! - `engine` - Immutable snapshots with hot reload
//! - `config` - Search, graph, and embedder settings
//! - `cli` - Command-line interface

pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod recommend;
pub mod retrieval;

// Re-export commonly used types
pub use catalog::{EmbeddingStore, Item, Modality};
pub use config::{EngineConfig, RecommendOptions, SearchOptions, SearchWeights};
pub use engine::{Engine, Snapshot};
pub use error::{FindabilityError, Result};
pub use recommend::{CoPurchaseGraph, RecommendationResult};
pub use retrieval::{HybridRanker, Query, ScoredResult};
