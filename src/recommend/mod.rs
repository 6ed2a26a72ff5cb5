//! Co-purchase recommendations
//!
//! A weighted "frequently bought together" graph, built once from edge
//! triples and queried per selected item.

use crate::config::{DuplicatePolicy, EdgeSymmetry, GraphConfig, RecommendOptions};
use crate::error::{FindabilityError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub mod loader;
pub mod synth;

pub use loader::*;
pub use synth::*;

/// One observed co-purchase relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoPurchaseEdge {
    pub source_id: String,
    pub related_id: String,
    /// Joint-purchase strength, >= 0
    pub weight: f32,
}

impl CoPurchaseEdge {
    pub fn new(source_id: impl Into<String>, related_id: impl Into<String>, weight: f32) -> Self {
        Self {
            source_id: source_id.into(),
            related_id: related_id.into(),
            weight,
        }
    }
}

/// A recommended item for a selected item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub item_id: String,
    pub related_item_id: String,
    /// Weight relative to the strongest outgoing edge of `item_id`
    pub match_score: f32,
    /// Raw merged edge weight
    pub weight: f32,
}

/// Outgoing edge after merging
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub related_id: String,
    pub weight: f32,
}

/// Counters collected while building the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub edges_read: usize,
    pub self_loops_dropped: usize,
    pub duplicates_merged: usize,
    pub sources: usize,
    pub edges: usize,
}

/// Immutable co-occurrence graph
#[derive(Debug, Clone, Default)]
pub struct CoPurchaseGraph {
    /// Neighbors per source, sorted by weight descending then id
    adjacency: HashMap<String, Vec<Neighbor>>,
    /// Lowercased source id -> canonical source id
    folded_sources: HashMap<String, String>,
    stats: GraphStats,
}

impl CoPurchaseGraph {
    /// Merge edges into a graph.
    ///
    /// Self-loops are dropped. Repeated pairs are merged per
    /// `config.duplicates`; with `EdgeSymmetry::Mirrored` each edge is
    /// followed by its reverse. Negative or non-finite weights and empty ids
    /// are `CorruptArtifact`.
    pub fn build<I>(edges: I, config: GraphConfig) -> Result<Self>
    where
        I: IntoIterator<Item = CoPurchaseEdge>,
    {
        let mut merged: BTreeMap<String, BTreeMap<String, f32>> = BTreeMap::new();
        let mut stats = GraphStats::default();

        for edge in edges {
            stats.edges_read += 1;
            validate_edge(&edge, stats.edges_read)?;

            if edge.source_id == edge.related_id {
                tracing::warn!("Dropping self-loop co-purchase edge for '{}'", edge.source_id);
                stats.self_loops_dropped += 1;
                continue;
            }

            if config.symmetry == EdgeSymmetry::Mirrored {
                insert_edge(
                    &mut merged,
                    &edge.related_id,
                    &edge.source_id,
                    edge.weight,
                    config.duplicates,
                    &mut stats,
                )?;
            }
            insert_edge(
                &mut merged,
                &edge.source_id,
                &edge.related_id,
                edge.weight,
                config.duplicates,
                &mut stats,
            )?;
        }

        let mut adjacency = HashMap::with_capacity(merged.len());
        let mut folded_sources = HashMap::with_capacity(merged.len());
        for (source, related) in merged {
            let mut neighbors: Vec<Neighbor> = related
                .into_iter()
                .map(|(related_id, weight)| Neighbor { related_id, weight })
                .collect();
            neighbors.sort_by(|a, b| {
                b.weight
                    .total_cmp(&a.weight)
                    .then_with(|| a.related_id.cmp(&b.related_id))
            });

            stats.edges += neighbors.len();
            // Sources iterate in ascending order, so the smallest id wins a fold collision
            folded_sources
                .entry(source.to_lowercase())
                .or_insert_with(|| source.clone());
            adjacency.insert(source, neighbors);
        }
        stats.sources = adjacency.len();

        tracing::info!(
            "Co-purchase graph built: {} sources, {} edges ({} self-loops dropped, {} duplicates merged)",
            stats.sources,
            stats.edges,
            stats.self_loops_dropped,
            stats.duplicates_merged
        );

        Ok(Self {
            adjacency,
            folded_sources,
            stats,
        })
    }

    /// Top related items for `item_id`.
    ///
    /// Unknown items and items without outgoing edges give an empty list.
    /// The id is matched exactly first, then case-insensitively.
    pub fn related(&self, item_id: &str, options: &RecommendOptions) -> Result<Vec<RecommendationResult>> {
        if options.top_k == 0 {
            return Err(FindabilityError::invalid_query("top_k must be > 0"));
        }

        let Some((source, neighbors)) = self.lookup(item_id) else {
            tracing::debug!("No co-purchase data for '{}'", item_id);
            return Ok(Vec::new());
        };

        // A folded lookup can land on a source whose neighbors include the requested id
        let mut candidates = neighbors
            .iter()
            .filter(|n| n.related_id != item_id.trim() && n.related_id != source)
            .peekable();
        let max_weight = candidates.peek().map(|n| n.weight).unwrap_or(0.0);

        let results = candidates
            .take(options.top_k)
            .map(|n| RecommendationResult {
                item_id: source.to_string(),
                related_item_id: n.related_id.clone(),
                match_score: if max_weight > 0.0 {
                    n.weight / max_weight
                } else {
                    0.0
                },
                weight: n.weight,
            })
            .collect();

        Ok(results)
    }

    /// Ids of the top related items
    pub fn related_ids(&self, item_id: &str, options: &RecommendOptions) -> Result<Vec<String>> {
        Ok(self
            .related(item_id, options)?
            .into_iter()
            .map(|r| r.related_item_id)
            .collect())
    }

    /// Merged outgoing edges of an exact source id
    pub fn neighbors(&self, source_id: &str) -> &[Neighbor] {
        self.adjacency
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Build counters
    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    pub fn source_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.stats.edges
    }

    fn lookup(&self, item_id: &str) -> Option<(&str, &[Neighbor])> {
        let item_id = item_id.trim();
        if let Some((source, neighbors)) = self.adjacency.get_key_value(item_id) {
            return Some((source.as_str(), neighbors.as_slice()));
        }
        let canonical = self.folded_sources.get(&item_id.to_lowercase())?;
        self.adjacency
            .get_key_value(canonical)
            .map(|(source, neighbors)| (source.as_str(), neighbors.as_slice()))
    }
}

fn validate_edge(edge: &CoPurchaseEdge, position: usize) -> Result<()> {
    if edge.source_id.trim().is_empty() || edge.related_id.trim().is_empty() {
        return Err(FindabilityError::corrupt(format!(
            "co-purchase edge {} has an empty item id",
            position
        )));
    }
    if !edge.weight.is_finite() || edge.weight < 0.0 {
        return Err(FindabilityError::corrupt(format!(
            "co-purchase edge {} ({} -> {}) has invalid weight {}",
            position, edge.source_id, edge.related_id, edge.weight
        )));
    }
    Ok(())
}

fn insert_edge(
    merged: &mut BTreeMap<String, BTreeMap<String, f32>>,
    source: &str,
    related: &str,
    weight: f32,
    policy: DuplicatePolicy,
    stats: &mut GraphStats,
) -> Result<()> {
    let targets = merged.entry(source.to_string()).or_default();
    match targets.get_mut(related) {
        Some(existing) => {
            stats.duplicates_merged += 1;
            let combined = match policy {
                DuplicatePolicy::Sum => *existing + weight,
                DuplicatePolicy::LastWins => weight,
            };
            if !combined.is_finite() {
                return Err(FindabilityError::corrupt(format!(
                    "merged co-purchase weight for {} -> {} overflows",
                    source, related
                )));
            }
            *existing = combined;
        }
        None => {
            targets.insert(related.to_string(), weight);
        }
    }
    Ok(())
}
