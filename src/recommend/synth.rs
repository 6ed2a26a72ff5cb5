//! Synthetic co-purchase data
//!
//! Stands in for transaction history when only a catalog is available:
//! items on the same catalog page are strongly related, items a page or two
//! away moderately, and random pairs fill each item up to `avg_links`.

use crate::catalog::Item;
use crate::recommend::CoPurchaseEdge;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};

const SAME_PAGE_WEIGHT: f32 = 0.9;
const NEARBY_PAGE_WEIGHT: f32 = 0.6;
const RANDOM_WEIGHT: f32 = 0.3;

/// Pages considered on each side of an item's page
const NEARBY_RADIUS: u32 = 2;
const MAX_NEARBY_PAGES: usize = 3;
const MAX_PER_NEARBY_PAGE: usize = 2;

/// Generator settings
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Minimum number of related items per product
    pub avg_links: usize,
    /// Random seed (None = entropy)
    pub seed: Option<u64>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            avg_links: 4,
            seed: Some(42),
        }
    }
}

/// Generate co-purchase edges for `items`, strongest first
pub fn generate_copurchase(items: &[Item], config: &SynthConfig) -> Vec<CoPurchaseEdge> {
    let mut seen = HashSet::new();
    let product_ids: Vec<&str> = items
        .iter()
        .map(|item| item.id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .collect();

    if product_ids.len() < 2 {
        tracing::warn!("Need at least two products to generate co-purchase data");
        return Vec::new();
    }

    let mut pages: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    let mut page_of: BTreeMap<&str, u32> = BTreeMap::new();
    for item in items {
        let id = item.id.trim();
        if let Some(page) = item.page {
            if !id.is_empty() && !page_of.contains_key(id) {
                page_of.insert(id, page);
                pages.entry(page).or_default().push(id);
            }
        }
    }
    let max_page = pages.keys().next_back().copied().unwrap_or(0);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tracing::info!(
        "Generating co-purchase data for {} products",
        product_ids.len()
    );

    let target = config.avg_links.min(product_ids.len() - 1);
    let mut edges = Vec::new();

    for &pid in &product_ids {
        let mut related: HashSet<&str> = HashSet::new();

        if let Some(&page) = page_of.get(pid) {
            for &other in pages.get(&page).into_iter().flatten() {
                link(pid, other, SAME_PAGE_WEIGHT, &mut related, &mut edges);
            }

            let first = page.saturating_sub(NEARBY_RADIUS).max(1);
            let last = (page + NEARBY_RADIUS).min(max_page);
            let nearby = (first..=last)
                .filter(|&p| p != page)
                .take(MAX_NEARBY_PAGES);
            for nearby_page in nearby {
                for &other in pages
                    .get(&nearby_page)
                    .into_iter()
                    .flatten()
                    .take(MAX_PER_NEARBY_PAGE)
                {
                    link(pid, other, NEARBY_PAGE_WEIGHT, &mut related, &mut edges);
                }
            }
        }

        while related.len() < target {
            let other = product_ids[rng.gen_range(0..product_ids.len())];
            link(pid, other, RANDOM_WEIGHT, &mut related, &mut edges);
        }
    }

    // Stable: equal weights keep generation order
    edges.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    tracing::info!("Generated {} co-purchase relationships", edges.len());
    edges
}

fn link<'a>(
    pid: &'a str,
    other: &'a str,
    weight: f32,
    related: &mut HashSet<&'a str>,
    edges: &mut Vec<CoPurchaseEdge>,
) {
    if other != pid && related.insert(other) {
        edges.push(CoPurchaseEdge::new(pid, other, weight));
    }
}
