use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use findability::cli::{self, GlobalArgs};

#[derive(Parser)]
#[command(name = "findability")]
#[command(about = "Findability - hybrid product search and co-purchase recommendations", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file (JSON array or JSON Lines), overrides the config
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Co-purchase CSV, overrides the config
    #[arg(long, global = true)]
    copurchase: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute text embeddings for catalog items
    Embed {
        /// Output catalog path
        #[arg(short, long)]
        output: String,

        /// Backend: token or mock
        #[arg(short, long)]
        backend: Option<String>,

        /// Embedding dimension
        #[arg(long)]
        dimension: Option<usize>,

        /// SQLite embedding cache path
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Recompute items that already have a text embedding
        #[arg(long)]
        force: bool,
    },

    /// Hybrid text search
    Search {
        /// Query text
        #[arg(short, long)]
        query: String,

        /// Precomputed query vector (JSON array); embedded locally if absent
        #[arg(long)]
        vector: Option<PathBuf>,

        /// Weight of the cosine similarity score
        #[arg(long)]
        semantic_weight: Option<f32>,

        /// Weight of the keyword overlap score
        #[arg(long)]
        keyword_weight: Option<f32>,

        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Query embedder backend: token or mock
        #[arg(short, long)]
        backend: Option<String>,

        /// Query embedding dimension
        #[arg(long)]
        dimension: Option<usize>,
    },

    /// Search by image vector
    SearchImage {
        /// Query vector (JSON array)
        #[arg(long)]
        vector: PathBuf,

        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Items frequently bought together with an item
    Related {
        /// Item id
        #[arg(short, long)]
        item: String,

        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Generate synthetic co-purchase data from catalog pages
    Copurchase {
        /// Output CSV path
        #[arg(short, long, default_value = "data/co_purchase.csv")]
        output: String,

        /// Related items per product
        #[arg(long, default_value = "4")]
        avg_links: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Show catalog and graph statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "findability=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let args = GlobalArgs {
        config: cli.config,
        catalog: cli.catalog,
        copurchase: cli.copurchase,
    };

    match cli.command {
        Commands::Embed {
            output,
            backend,
            dimension,
            cache,
            force,
        } => {
            cli::embed(args, output, backend, dimension, cache, force).await?;
        }

        Commands::Search {
            query,
            vector,
            semantic_weight,
            keyword_weight,
            top_k,
            backend,
            dimension,
        } => {
            cli::search(
                args,
                query,
                vector,
                semantic_weight,
                keyword_weight,
                top_k,
                backend,
                dimension,
            )
            .await?;
        }

        Commands::SearchImage { vector, top_k } => {
            cli::search_image(args, vector, top_k).await?;
        }

        Commands::Related { item, top_k } => {
            cli::related(args, item, top_k).await?;
        }

        Commands::Copurchase {
            output,
            avg_links,
            seed,
        } => {
            cli::copurchase(args, output, avg_links, Some(seed)).await?;
        }

        Commands::Stats { json } => {
            cli::stats(args, json).await?;
        }
    }

    Ok(())
}
