use crate::error::Result;
use crate::types::Embedding;

/// Text -> vector capability. Every backend (local model, HTTP service, test
/// double) sits behind this trait; nothing else in the workspace names a
/// concrete backend.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:nomic-embed-text:d768`).
    fn embedder_id(&self) -> &str;
    /// Output dimensionality.
    fn dim(&self) -> usize;
    /// Embed one text. Malformed model output is an `EmbeddingFailure`.
    fn embed(&self, text: &str) -> Result<Embedding>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Prompt -> reply capability for the external language model.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}
