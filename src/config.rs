//! Engine configuration
//!
//! Validated query options plus the file-backed configuration used by the
//! command-line front end.

use crate::error::{FindabilityError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on a single fusion weight. Both signals lie in [0, 1], so the
/// combined score stays well inside f32 range.
pub const MAX_WEIGHT: f32 = 1.0e6;

/// Weights applied to the semantic and keyword signals during fusion.
///
/// The weights need not sum to 1. A zero weight disables that signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWeights {
    /// Weight of the rescaled cosine similarity
    pub semantic: f32,
    /// Weight of the keyword overlap score
    pub keyword: f32,
}

impl SearchWeights {
    /// Create validated weights
    pub fn new(semantic: f32, keyword: f32) -> Result<Self> {
        let weights = Self { semantic, keyword };
        weights.validate()?;
        Ok(weights)
    }

    /// Pure semantic ranking (image search has no keyword signal)
    pub fn semantic_only() -> Self {
        Self {
            semantic: 1.0,
            keyword: 0.0,
        }
    }

    /// Check that both weights lie in [0, MAX_WEIGHT] and are not both zero
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("semantic", self.semantic), ("keyword", self.keyword)] {
            if !(0.0..=MAX_WEIGHT).contains(&value) {
                return Err(FindabilityError::invalid_query(format!(
                    "{} weight must be between 0 and {}, got {}",
                    name, MAX_WEIGHT, value
                )));
            }
        }
        if self.semantic == 0.0 && self.keyword == 0.0 {
            return Err(FindabilityError::invalid_query(
                "at least one of the semantic/keyword weights must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            keyword: 0.3,
        }
    }
}

/// Options for a single `rank` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub weights: SearchWeights,
    pub top_k: usize,
}

impl SearchOptions {
    /// Create validated search options
    pub fn new(weights: SearchWeights, top_k: usize) -> Result<Self> {
        weights.validate()?;
        if top_k == 0 {
            return Err(FindabilityError::invalid_query("top_k must be > 0"));
        }
        Ok(Self { weights, top_k })
    }
}

/// Options for a single `related` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub top_k: usize,
}

impl RecommendOptions {
    /// Create validated recommendation options
    pub fn new(top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(FindabilityError::invalid_query("top_k must be > 0"));
        }
        Ok(Self { top_k })
    }
}

/// Keyword scorer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Query tokens shorter than this (in chars) are ignored
    pub min_token_len: usize,
    /// Let a query token match inside a longer item token ("label" in "labels")
    pub substring_match: bool,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            min_token_len: 1,
            substring_match: true,
        }
    }
}

/// How repeated `(source, related)` pairs in the edge source are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Add the weights together
    #[default]
    Sum,
    /// Keep the weight seen last
    LastWins,
}

/// Whether edges are taken as given or mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSymmetry {
    /// `A -> B` only recommends B from A
    #[default]
    Directed,
    /// Every `A -> B` also inserts `B -> A` with the same weight
    Mirrored,
}

/// Co-occurrence graph build settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub duplicates: DuplicatePolicy,
    pub symmetry: EdgeSymmetry,
}

/// Query embedder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderSettings {
    /// Backend name: token or mock
    pub backend: String,
    /// Model name recorded in the cache
    pub model_name: String,
    /// Output dimension
    pub dimension: usize,
    /// Optional SQLite cache for computed embeddings
    pub cache_path: Option<PathBuf>,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            backend: "token".to_string(),
            model_name: "token-embedder".to_string(),
            dimension: 384,
            cache_path: None,
        }
    }
}

/// Top-level configuration read by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Catalog file (JSON array or JSON Lines)
    pub catalog_path: Option<PathBuf>,
    /// Co-purchase CSV file
    pub copurchase_path: Option<PathBuf>,
    pub weights: SearchWeights,
    pub top_k: usize,
    pub keyword: KeywordConfig,
    pub graph: GraphConfig,
    pub embedder: EmbedderSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            copurchase_path: None,
            weights: SearchWeights::default(),
            top_k: 5,
            keyword: KeywordConfig::default(),
            graph: GraphConfig::default(),
            embedder: EmbedderSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        tracing::debug!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Validate the embedded defaults
    pub fn validate(&self) -> Result<()> {
        SearchOptions::new(self.weights, self.top_k)?;
        if self.embedder.dimension == 0 {
            return Err(FindabilityError::invalid_query(
                "embedder dimension must be > 0",
            ));
        }
        Ok(())
    }

    /// Default search options derived from this config
    pub fn search_options(&self) -> Result<SearchOptions> {
        SearchOptions::new(self.weights, self.top_k)
    }
}
