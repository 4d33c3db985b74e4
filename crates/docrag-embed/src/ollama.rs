//! Embeddings served by an Ollama instance (`POST /api/embed`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docrag_core::config::EmbeddingSettings;
use docrag_core::{validate_embedding, Embedder, Embedding, Error};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dim: usize,
    agent: ureq::Agent,
    id: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dim: usize, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dim,
            agent,
            id: format!("ollama:{}:d{}", model, dim),
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self::new(&settings.ollama_url, &settings.model, settings.dim, Duration::from_secs(settings.timeout_secs))
    }

    fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let request_json = serde_json::to_string(&EmbedRequest { model: &self.model, input: inputs })
            .context("Failed to serialize embedding request")?;
        debug!("POST {} ({} inputs)", url, inputs.len());
        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Embedding request to {} failed", url))?;
        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;
        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> docrag_core::Result<Embedding> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| Error::EmbeddingFailure("empty response".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> docrag_core::Result<Vec<Embedding>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let vectors = self.request(texts).map_err(|e| Error::EmbeddingFailure(format!("{e:#}")))?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingFailure(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        for v in &vectors { validate_embedding(self.dim, v)?; }
        Ok(vectors)
    }
}
