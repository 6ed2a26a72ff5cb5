//! Command-line interface
//!
//! Provides CLI commands for embed, search, search-image, related,
//! copurchase, and stats.

use crate::catalog::{load_catalog, load_vector, save_catalog, Modality};
use crate::config::{EngineConfig, SearchOptions, SearchWeights};
use crate::embedding::{create_embedder, Embedder, Embedding, EmbeddingCache, EmbeddingConfig};
use crate::engine::{Engine, Snapshot};
use crate::recommend::{generate_copurchase, save_edges, SynthConfig};
use crate::retrieval::{Query, ScoredResult};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub copurchase: Option<PathBuf>,
}

/// Load the config file (if any) and apply command-line path overrides
pub fn resolve_config(args: &GlobalArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => EngineConfig::default(),
    };

    if let Some(catalog) = &args.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(copurchase) = &args.copurchase {
        config.copurchase_path = Some(copurchase.clone());
    }
    Ok(config)
}

fn override_embedder(config: &mut EngineConfig, backend: Option<String>, dimension: Option<usize>) {
    if let Some(backend) = backend {
        config.embedder.backend = backend;
    }
    if let Some(dimension) = dimension {
        config.embedder.dimension = dimension;
    }
}

fn query_embedder(config: &EngineConfig) -> Result<Arc<dyn Embedder>> {
    let settings = &config.embedder;
    let embedding_config = EmbeddingConfig {
        model_name: settings.model_name.clone(),
        ..Default::default()
    };
    Ok(create_embedder(&settings.backend, embedding_config, settings.dimension)?)
}

fn open_cache(config: &EngineConfig) -> Result<Option<EmbeddingCache>> {
    match &config.embedder.cache_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create cache directory: {:?}", parent))?;
            }
            let cache = EmbeddingCache::new(path, config.embedder.model_name.clone())
                .context(format!("Failed to open embedding cache: {:?}", path))?;
            Ok(Some(cache))
        }
        None => Ok(None),
    }
}

fn embed_text(
    text: &str,
    embedder: &dyn Embedder,
    cache: Option<&EmbeddingCache>,
) -> Result<Embedding> {
    let embedding = match cache {
        Some(cache) => cache.get_or_embed(text, embedder)?,
        None => embedder.embed(text)?,
    };
    Ok(embedding)
}

fn load_engine(config: &EngineConfig) -> Result<Engine> {
    let path = config
        .catalog_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No catalog given; pass --catalog or set catalog_path"))?;
    let engine = Engine::load(config).context(format!("Failed to load catalog: {:?}", path))?;

    let snapshot = engine.snapshot();
    tracing::info!(
        "Loaded {} items ({} with text vectors, {} with image vectors)",
        snapshot.metadata().items,
        snapshot.metadata().text_embedded,
        snapshot.metadata().image_embedded
    );
    Ok(engine)
}

fn print_results(results: &[ScoredResult], snapshot: &Snapshot) {
    println!("Found {} results:\n", results.len());

    for (rank, result) in results.iter().enumerate() {
        let name = snapshot
            .store()
            .get(&result.item_id)
            .map(|item| item.name.as_str())
            .unwrap_or("");
        println!(
            "Rank {}: {} (score: {:.4})",
            rank + 1,
            result.item_id,
            result.combined_score
        );
        println!("  Name: {}", name);
        println!(
            "  Semantic: {:.4}  Keyword: {:.4}",
            result.semantic_score, result.keyword_score
        );
        println!();
    }
}

/// Execute the embed command - fill in missing text vectors
pub async fn embed(
    args: GlobalArgs,
    output: String,
    backend: Option<String>,
    dimension: Option<usize>,
    cache: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let mut config = resolve_config(&args)?;
    override_embedder(&mut config, backend, dimension);
    if cache.is_some() {
        config.embedder.cache_path = cache;
    }

    let input = config
        .catalog_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No catalog given; pass --catalog or set catalog_path"))?;

    tracing::info!("Starting embedding pipeline");
    tracing::info!("  Catalog: {:?}", input);
    tracing::info!("  Output: {}", output);
    tracing::info!("  Backend: {}", config.embedder.backend);

    let mut items = load_catalog(&input).context(format!("Failed to load catalog: {:?}", input))?;
    let embedder = query_embedder(&config)?;
    let cache = open_cache(&config)?;

    tracing::info!(
        "  Using embedder: {} (dim={})",
        embedder.model_name(),
        embedder.dimension()
    );

    let mut embedded = 0;
    let mut skipped = 0;
    for item in items.iter_mut() {
        if item.text_embedding.is_some() && !force {
            continue;
        }

        let text = item.embedding_text();
        if text.trim().is_empty() {
            tracing::warn!("Item '{}' has no text to embed", item.id);
            skipped += 1;
            continue;
        }

        item.text_embedding = Some(embed_text(&text, embedder.as_ref(), cache.as_ref())?);
        embedded += 1;
    }

    let output_path = Path::new(&output);
    save_catalog(output_path, &items).context(format!("Failed to write catalog: {}", output))?;

    tracing::info!("Embedding complete!");

    println!("\nEmbedding Summary:");
    println!("  Items in catalog: {}", items.len());
    println!("  Embeddings generated: {}", embedded);
    println!("  Items without text: {}", skipped);
    println!("  Embedding dimension: {}", embedder.dimension());
    if let Some(cache) = &cache {
        println!("  Cache entries: {}", cache.len()?);
    }
    println!("  Output: {}", output);

    Ok(())
}

/// Execute the search command - hybrid text search
pub async fn search(
    args: GlobalArgs,
    query: String,
    vector: Option<PathBuf>,
    semantic_weight: Option<f32>,
    keyword_weight: Option<f32>,
    top_k: Option<usize>,
    backend: Option<String>,
    dimension: Option<usize>,
) -> Result<()> {
    let mut config = resolve_config(&args)?;
    override_embedder(&mut config, backend, dimension);
    let weights = SearchWeights::new(
        semantic_weight.unwrap_or(config.weights.semantic),
        keyword_weight.unwrap_or(config.weights.keyword),
    )?;
    let options = SearchOptions::new(weights, top_k.unwrap_or(config.top_k))?;

    tracing::info!("Starting search");
    tracing::info!("  Query: {}", query);
    tracing::info!(
        "  Weights: semantic={} keyword={}",
        weights.semantic,
        weights.keyword
    );
    tracing::info!("  Top-k: {}", options.top_k);

    let engine = load_engine(&config)?;
    let snapshot = engine.snapshot();

    let request = if weights.semantic == 0.0 {
        Query::keywords(query.clone())
    } else {
        let embedding = match &vector {
            Some(path) => load_vector(path).context(format!("Failed to read vector: {:?}", path))?,
            None => {
                let embedder = query_embedder(&config)?;
                let cache = open_cache(&config)?;
                embed_text(&query, embedder.as_ref(), cache.as_ref())?
            }
        };
        Query::text(query.clone(), embedding)
    };

    let results = snapshot.rank(&request, Modality::Text, &options)?;

    println!("\nQuery: {}", query);
    print_results(&results, &snapshot);

    Ok(())
}

/// Execute the search-image command - rank by image vector similarity
pub async fn search_image(args: GlobalArgs, vector: PathBuf, top_k: Option<usize>) -> Result<()> {
    let config = resolve_config(&args)?;
    let options = SearchOptions::new(SearchWeights::semantic_only(), top_k.unwrap_or(config.top_k))?;

    tracing::info!("Starting image search");
    tracing::info!("  Vector: {:?}", vector);
    tracing::info!("  Top-k: {}", options.top_k);

    let embedding = load_vector(&vector).context(format!("Failed to read vector: {:?}", vector))?;
    let engine = load_engine(&config)?;
    let snapshot = engine.snapshot();

    if snapshot.metadata().image_embedded == 0 {
        tracing::warn!("Catalog has no image vectors");
    }

    let results = snapshot.rank(&Query::image(embedding), Modality::Image, &options)?;

    println!("\nImage query: {:?}", vector);
    print_results(&results, &snapshot);

    Ok(())
}

/// Execute the related command - co-purchase recommendations
pub async fn related(args: GlobalArgs, item: String, top_k: Option<usize>) -> Result<()> {
    let config = resolve_config(&args)?;
    let top_k = top_k.unwrap_or(config.top_k);

    tracing::info!("Looking up co-purchases");
    tracing::info!("  Item: {}", item);
    tracing::info!("  Top-k: {}", top_k);

    let engine = load_engine(&config)?;
    let snapshot = engine.snapshot();
    let results = snapshot.related(&item, top_k)?;

    println!("\nFrequently bought with {}:", item);
    if results.is_empty() {
        println!("  (no co-purchase data)");
    }
    for (rank, result) in results.iter().enumerate() {
        let name = snapshot
            .store()
            .find(&result.related_item_id)
            .map(|found| found.name.as_str())
            .unwrap_or("");
        println!(
            "Rank {}: {} (match: {:.4}, weight: {})",
            rank + 1,
            result.related_item_id,
            result.match_score,
            result.weight
        );
        if !name.is_empty() {
            println!("  Name: {}", name);
        }
    }

    Ok(())
}

/// Execute the copurchase command - generate synthetic co-purchase data
pub async fn copurchase(
    args: GlobalArgs,
    output: String,
    avg_links: usize,
    seed: Option<u64>,
) -> Result<()> {
    let config = resolve_config(&args)?;
    let input = config
        .catalog_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No catalog given; pass --catalog or set catalog_path"))?;

    tracing::info!("Generating co-purchase data");
    tracing::info!("  Catalog: {:?}", input);
    tracing::info!("  Output: {}", output);
    tracing::info!("  Links per item: {}", avg_links);

    let items = load_catalog(&input).context(format!("Failed to load catalog: {:?}", input))?;
    let edges = generate_copurchase(&items, &SynthConfig { avg_links, seed });

    let output_path = Path::new(&output);
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .context(format!("Failed to create output directory: {:?}", parent))?;
    }
    save_edges(output_path, &edges).context(format!("Failed to write edges: {}", output))?;

    println!("\nCo-purchase Summary:");
    println!("  Products: {}", items.len());
    println!("  Relationships: {}", edges.len());
    println!("  Output: {}", output);

    Ok(())
}

/// Execute the stats command - describe the loaded snapshot
pub async fn stats(args: GlobalArgs, json: bool) -> Result<()> {
    let config = resolve_config(&args)?;
    let engine = load_engine(&config)?;
    let snapshot = engine.snapshot();
    let metadata = snapshot.metadata();

    if json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
        return Ok(());
    }

    let dimension = |d: Option<usize>| d.map_or_else(|| "-".to_string(), |d| d.to_string());

    println!("\nSnapshot:");
    println!("  Loaded at: {}", metadata.loaded_at.to_rfc3339());
    println!("  Items: {}", metadata.items);
    println!(
        "  Text vectors: {} (dim {})",
        metadata.text_embedded,
        dimension(metadata.text_dimension)
    );
    println!(
        "  Image vectors: {} (dim {})",
        metadata.image_embedded,
        dimension(metadata.image_dimension)
    );
    println!("\nCo-purchase graph:");
    println!("  Sources: {}", metadata.graph.sources);
    println!("  Edges: {}", metadata.graph.edges);
    println!("  Rows read: {}", metadata.graph.edges_read);
    println!("  Self-loops dropped: {}", metadata.graph.self_loops_dropped);
    println!("  Duplicates merged: {}", metadata.graph.duplicates_merged);

    Ok(())
}
