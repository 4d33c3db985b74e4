//! docrag-embed
//!
//! Embedding adapters behind [`docrag_core::Embedder`]: a local candle model,
//! an Ollama HTTP client, and a deterministic fake for tests.

pub mod fake;
pub mod model;
pub mod ollama;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use tracing::info;

use docrag_core::config::{EmbeddingProvider, EmbeddingSettings};
use docrag_core::Embedder;

pub use fake::FakeEmbedder;
pub use model::{resolve_model_dir, EmbeddingModel};
pub use ollama::OllamaEmbedder;
pub use pool::masked_mean_l2;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder selected by `settings`. The adapter's dimension must
/// match `settings.dim`, since that is what the index is created with.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let provider = if fake_embeddings_forced() { EmbeddingProvider::Fake } else { settings.provider };
    let embedder: Box<dyn Embedder> = match provider {
        EmbeddingProvider::Fake => Box::new(FakeEmbedder::new(settings.dim)),
        EmbeddingProvider::Ollama => Box::new(OllamaEmbedder::from_settings(settings)),
        EmbeddingProvider::Local => {
            let dir = resolve_model_dir(settings.model_dir.as_deref())?;
            Box::new(EmbeddingModel::new(&dir, settings.max_len)?)
        }
    };
    if embedder.dim() != settings.dim {
        anyhow::bail!(
            "embedder {} produces {}-dim vectors but embedding.dim is {}",
            embedder.embedder_id(),
            embedder.dim(),
            settings.dim
        );
    }
    info!("Using embedder {}", embedder.embedder_id());
    Ok(embedder)
}
