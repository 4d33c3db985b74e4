use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docrag_core::config::resolve_with_base;
use docrag_retrieval::RagPipeline;
use docrag_vector::read_manifest;

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Retrieval-augmented question answering over a local document index")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Index directory (default: data.index_dir)
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the nearest passages and their distances
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Print the context block that would be sent to the generator
    Context {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Answer one or more questions; prints `{query, response}` JSON
    Ask {
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Describe the persisted index
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docrag_cli::init_tracing();
    let cli = Cli::parse();
    let mut settings = docrag_cli::load_settings(cli.config.as_deref())?;
    if let Some(index) = &cli.index {
        let cwd = std::env::current_dir()?;
        settings.data.index_dir = resolve_with_base(&cwd, index.to_string_lossy()).to_string_lossy().to_string();
    }

    match cli.command {
        Commands::Search { query, top_k } => {
            let context = RagPipeline::from_settings(&settings)?.context(&query, top_k)?;
            for (rank, hit) in context.hits().iter().enumerate() {
                println!("{:>2}. [{:.4}] #{} {}", rank + 1, hit.distance, hit.passage.id, hit.passage.text);
            }
            if context.is_empty() {
                println!("No passages found.");
            }
        }
        Commands::Context { query, top_k } => {
            println!("{}", RagPipeline::from_settings(&settings)?.context(&query, top_k)?);
        }
        Commands::Ask { queries, top_k } => {
            let pipeline = RagPipeline::from_settings(&settings)?;
            let answers = futures::future::try_join_all(queries.iter().map(|q| pipeline.answer(q, top_k))).await?;
            for answer in answers {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            }
        }
        Commands::Stats => {
            let dir = settings.data.index_path();
            let manifest = read_manifest(&dir)?;
            println!("Index: {}", dir.display());
            println!("Passages: {}", manifest.count);
            println!("Dimension: {}", manifest.vector_dim);
            println!("Embedder: {}", manifest.embedder_id.as_deref().unwrap_or("unknown"));
            println!("Created: {}", manifest.created_at);
            println!("Vectors: {}", manifest.vectors_file);
        }
    }
    Ok(())
}
