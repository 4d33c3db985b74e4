use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docrag_core::config::resolve_with_base;
use docrag_core::data_processor::{ChunkingConfig, DataProcessor};
use docrag_core::{ChunkingStrategy, IngestMode};
use docrag_embed::get_default_embedder;
use docrag_vector::Ingestor;
use tracing::{info, warn};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Strict,
    Lenient,
}

#[derive(Clone, Copy, ValueEnum)]
enum Chunking {
    Lines,
    Paragraphs,
}

#[derive(Parser)]
#[command(name = "docrag-indexer")]
#[command(about = "Embed a directory of .txt documents and persist the vector index")]
#[command(version)]
struct Args {
    /// Directory of .txt documents (default: data.raw_txt_dir)
    data_dir: Option<PathBuf>,
    /// Output index directory (default: data.index_dir)
    #[arg(long)]
    index: Option<PathBuf>,
    /// Failure policy for passages that cannot be embedded (default: ingest.mode)
    #[arg(long, value_enum)]
    mode: Option<Mode>,
    /// Passage splitting strategy (default: ingest.chunking)
    #[arg(long, value_enum)]
    chunking: Option<Chunking>,
    /// Only ingest the first N documents
    #[arg(long)]
    limit: Option<usize>,
    /// Config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Disable the progress bar
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    docrag_cli::init_tracing();
    let args = Args::parse();
    let settings = docrag_cli::load_settings(args.config.as_deref())?;
    let cwd = std::env::current_dir()?;

    let data_dir = args
        .data_dir
        .map(|p| resolve_with_base(&cwd, p.to_string_lossy()))
        .unwrap_or_else(|| settings.data.raw_txt_path());
    let index_dir = args
        .index
        .map(|p| resolve_with_base(&cwd, p.to_string_lossy()))
        .unwrap_or_else(|| settings.data.index_path());
    let mode = match args.mode {
        Some(Mode::Strict) => IngestMode::Strict,
        Some(Mode::Lenient) => IngestMode::Lenient,
        None => settings.ingest.mode,
    };
    let strategy = match args.chunking {
        Some(Chunking::Lines) => ChunkingStrategy::Lines,
        Some(Chunking::Paragraphs) => ChunkingStrategy::Paragraphs,
        None => settings.ingest.chunking,
    };

    info!("Data directory: {}", data_dir.display());
    info!("Index directory: {}", index_dir.display());
    let documents = DataProcessor::new().load_documents(&data_dir, args.limit)?;
    if documents.is_empty() {
        warn!("Nothing to index; the index is saved empty");
    }

    let embedder = get_default_embedder(&settings.embedding)?;
    let chunking = ChunkingConfig {
        strategy,
        max_words: settings.ingest.max_words,
        overlap_percent: settings.ingest.overlap_percent,
    };
    let report = Ingestor::new(embedder.as_ref(), mode)
        .with_chunking(chunking)
        .with_batch_size(settings.ingest.batch_size)
        .with_progress(!args.quiet)
        .ingest(&documents, settings.embedding.dim)?;

    for skipped in &report.skipped {
        warn!("Skipped {}#{}: {}", skipped.document, skipped.position, skipped.reason);
    }
    report.index.save(&index_dir)?;
    println!(
        "Indexed {} passages from {} documents into {} ({} skipped, {} duplicate texts)",
        report.indexed(),
        report.documents,
        index_dir.display(),
        report.skipped.len(),
        report.cache_hits
    );
    Ok(())
}
