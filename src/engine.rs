//! Query-serving engine
//!
//! A `Snapshot` bundles the embedding store and the co-purchase graph. It is
//! built completely before it is published and never mutated afterwards.
//! `Engine` holds the current snapshot and can swap in a new one; readers
//! clone the `Arc` and never see a partially built state.

use crate::catalog::{load_catalog, EmbeddingStore, Modality};
use crate::config::{EngineConfig, KeywordConfig, RecommendOptions, SearchOptions};
use crate::error::{FindabilityError, Result};
use crate::recommend::{load_edges, CoPurchaseGraph, GraphStats, RecommendationResult};
use crate::retrieval::{HybridRanker, Query, ScoredResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Summary of a loaded snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMetadata {
    pub loaded_at: DateTime<Utc>,
    pub items: usize,
    pub text_dimension: Option<usize>,
    pub text_embedded: usize,
    pub image_dimension: Option<usize>,
    pub image_embedded: usize,
    pub graph: GraphStats,
}

/// Immutable catalog + graph pair served to queries
#[derive(Debug)]
pub struct Snapshot {
    store: EmbeddingStore,
    graph: CoPurchaseGraph,
    keyword: KeywordConfig,
    metadata: SnapshotMetadata,
}

impl Snapshot {
    pub fn new(store: EmbeddingStore, graph: CoPurchaseGraph, keyword: KeywordConfig) -> Self {
        let metadata = SnapshotMetadata {
            loaded_at: Utc::now(),
            items: store.len(),
            text_dimension: store.dimension(Modality::Text),
            text_embedded: store.embedded_count(Modality::Text),
            image_dimension: store.dimension(Modality::Image),
            image_embedded: store.embedded_count(Modality::Image),
            graph: graph.stats(),
        };

        Self {
            store,
            graph,
            keyword,
            metadata,
        }
    }

    /// Build a snapshot from the artifacts named in `config`.
    ///
    /// The catalog is required. A configured co-purchase file that does not
    /// exist yields an empty graph; a malformed one fails the load.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let catalog_path = config
            .catalog_path
            .as_deref()
            .ok_or_else(|| FindabilityError::NotFound("no catalog path configured".to_string()))?;
        let store = EmbeddingStore::new(load_catalog(catalog_path)?)?;

        let graph = match config.copurchase_path.as_deref() {
            Some(path) if path.exists() => CoPurchaseGraph::build(load_edges(path)?, config.graph)?,
            Some(path) => {
                tracing::warn!(
                    "Co-purchase data not found at {:?}; recommendations disabled",
                    path
                );
                CoPurchaseGraph::default()
            }
            None => CoPurchaseGraph::default(),
        };

        Ok(Self::new(store, graph, config.keyword))
    }

    /// Fused ranking against this snapshot
    pub fn rank(
        &self,
        query: &Query,
        modality: Modality,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredResult>> {
        HybridRanker::new(&self.store, self.keyword).rank(query, modality, options)
    }

    /// Top co-purchase neighbors of `item_id`
    pub fn related(&self, item_id: &str, top_k: usize) -> Result<Vec<RecommendationResult>> {
        self.graph.related(item_id, &RecommendOptions::new(top_k)?)
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }
}

/// Holder of the current snapshot
#[derive(Debug)]
pub struct Engine {
    current: RwLock<Arc<Snapshot>>,
}

impl Engine {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Load artifacts and start serving them
    pub fn load(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(Snapshot::load(config)?))
    }

    /// The snapshot queries should run against
    pub fn snapshot(&self) -> Arc<Snapshot> {
        // The lock only guards an Arc assignment, so a poisoned value is still whole
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Publish `next`, returning the snapshot it replaced
    pub fn swap(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    /// Rebuild from `config` and swap. On failure the old snapshot keeps serving.
    pub fn reload(&self, config: &EngineConfig) -> Result<()> {
        let next = Snapshot::load(config)?;
        tracing::info!(
            "Reloaded snapshot: {} items, {} co-purchase edges",
            next.metadata.items,
            next.metadata.graph.edges
        );
        self.swap(next);
        Ok(())
    }

    pub fn rank(
        &self,
        query: &Query,
        modality: Modality,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredResult>> {
        self.snapshot().rank(query, modality, options)
    }

    pub fn related(&self, item_id: &str, top_k: usize) -> Result<Vec<RecommendationResult>> {
        self.snapshot().related(item_id, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{save_catalog, Item};
    use crate::config::{GraphConfig, SearchWeights};
    use crate::recommend::{save_edges, CoPurchaseEdge};
    use std::thread;
    use tempfile::tempdir;

    fn snapshot(n: usize) -> Snapshot {
        let items = (0..n)
            .map(|i| {
                Item::new(format!("P{}", i), format!("Part {}", i))
                    .with_text_embedding(vec![1.0, i as f32])
            })
            .collect();
        let store = EmbeddingStore::new(items).unwrap();
        let graph = CoPurchaseGraph::build(
            vec![CoPurchaseEdge::new("P0", "P1", 10.0)],
            GraphConfig::default(),
        )
        .unwrap();
        Snapshot::new(store, graph, KeywordConfig::default())
    }

    #[test]
    fn test_snapshot_rank_and_related() {
        let snapshot = snapshot(3);
        let options = SearchOptions::new(SearchWeights::semantic_only(), 2).unwrap();

        let ranked = snapshot
            .rank(&Query::vector(vec![1.0, 0.0]), Modality::Text, &options)
            .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item_id, "P0");

        let related = snapshot.related("P0", 5).unwrap();
        assert_eq!(related[0].related_item_id, "P1");
        assert!(snapshot.related("P0", 0).is_err());
    }

    #[test]
    fn test_swap_replaces_snapshot() {
        let engine = Engine::new(snapshot(2));
        let before = engine.snapshot();

        let previous = engine.swap(snapshot(5));

        assert_eq!(previous.metadata().items, 2);
        assert_eq!(before.metadata().items, 2);
        assert_eq!(engine.snapshot().metadata().items, 5);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let engine = Arc::new(Engine::new(snapshot(2)));
        let options = SearchOptions::new(SearchWeights::semantic_only(), 100).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = engine.snapshot();
                        let ranked = snapshot
                            .rank(&Query::vector(vec![1.0, 1.0]), Modality::Text, &options)
                            .unwrap();
                        assert_eq!(ranked.len(), snapshot.metadata().items);
                    }
                })
            })
            .collect();

        for n in 3..20 {
            engine.swap(snapshot(n));
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(engine.snapshot().metadata().items, 19);
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        let edges = dir.path().join("co_purchase.csv");
        save_catalog(
            &catalog,
            &[
                Item::new("A", "Caution Label Yellow").with_text_embedding(vec![1.0, 0.0]),
                Item::new("B", "Pump").with_text_embedding(vec![0.0, 1.0]),
            ],
        )
        .unwrap();
        save_edges(&edges, &[CoPurchaseEdge::new("A", "B", 0.9)]).unwrap();

        let config = EngineConfig {
            catalog_path: Some(catalog),
            copurchase_path: Some(edges),
            ..Default::default()
        };
        let engine = Engine::load(&config).unwrap();

        let results = engine
            .rank(
                &Query::text("yellow caution label", vec![1.0, 0.0]),
                Modality::Text,
                &config.search_options().unwrap(),
            )
            .unwrap();
        assert_eq!(results[0].item_id, "A");
        assert_eq!(results[0].keyword_score, 1.0);
        assert_eq!(engine.related("a", 5).unwrap()[0].related_item_id, "B");
    }

    #[test]
    fn test_missing_copurchase_file_disables_recommendations() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        save_catalog(&catalog, &[Item::new("A", "a")]).unwrap();

        let config = EngineConfig {
            catalog_path: Some(catalog),
            copurchase_path: Some(dir.path().join("missing.csv")),
            ..Default::default()
        };
        let engine = Engine::load(&config).unwrap();

        assert!(engine.related("A", 5).unwrap().is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_old_snapshot() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        std::fs::write(
            &catalog,
            r#"[{"id": "A", "name": "a", "text_embedding": [1.0, 0.0]},
                {"id": "B", "name": "b", "text_embedding": [1.0]}]"#,
        )
        .unwrap();

        let engine = Engine::new(snapshot(2));
        let config = EngineConfig {
            catalog_path: Some(catalog),
            ..Default::default()
        };

        let err = engine.reload(&config).unwrap_err();
        assert!(matches!(err, FindabilityError::CorruptArtifact(_)));
        assert_eq!(engine.snapshot().metadata().items, 2);
    }
}
