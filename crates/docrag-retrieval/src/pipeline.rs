//! The query-time pipeline: retrieve a context, then ask the generator.
//!
//! `RagPipeline` is built once at process start and shared by every request;
//! it owns the embedder, the serving index and the generator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use docrag_core::config::Settings;
use docrag_core::{Embedder, Error, Generator, Result};
use docrag_embed::get_default_embedder;
use docrag_vector::{SharedIndex, VectorIndex};

use crate::context::{RetrievalContextBuilder, RetrievedContext};
use crate::generation::OllamaGenerator;

/// Response shape of the query API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub query: String,
    pub response: String,
}

#[derive(Clone)]
pub struct RagPipeline {
    builder: RetrievalContextBuilder,
    generator: Arc<dyn Generator>,
    default_top_k: usize,
    index_dir: Option<PathBuf>,
}

impl RagPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<SharedIndex>, generator: Arc<dyn Generator>) -> Self {
        Self {
            builder: RetrievalContextBuilder::new(embedder, index),
            generator,
            default_top_k: 5,
            index_dir: None,
        }
    }

    /// Embedder, persisted index and Ollama generator as configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
        let index_dir = settings.data.index_path();
        let index = VectorIndex::load(&index_dir, settings.embedding.dim)?;
        if let Some(stored) = index.embedder_id().filter(|id| *id != embedder.embedder_id()) {
            warn!("Index was built with {} but queries use {}", stored, embedder.embedder_id());
        }
        let generator = Arc::new(OllamaGenerator::from_settings(&settings.generation));
        Ok(Self::new(embedder, Arc::new(SharedIndex::new(index)), generator)
            .with_default_top_k(settings.retrieval.top_k)
            .with_require_results(settings.retrieval.require_results)
            .with_index_dir(index_dir))
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn with_require_results(mut self, require_results: bool) -> Self {
        self.builder = self.builder.with_require_results(require_results);
        self
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = Some(dir.into());
        self
    }

    pub fn index(&self) -> &Arc<SharedIndex> { self.builder.index() }
    pub fn default_top_k(&self) -> usize { self.default_top_k }
    pub fn index_dir(&self) -> Option<&Path> { self.index_dir.as_deref() }

    pub fn context(&self, query: &str, top_k: Option<usize>) -> Result<RetrievedContext> {
        self.builder.build_context(query, top_k.unwrap_or(self.default_top_k))
    }

    /// Blocking form of [`RagPipeline::answer`].
    pub fn answer_blocking(&self, query: &str, top_k: Option<usize>) -> Result<Answer> {
        let context = self.context(query, top_k)?;
        let response = self.generator.generate(context.as_str())?;
        Ok(Answer { query: query.to_string(), response })
    }

    /// Retrieve and generate on the blocking pool, so many queries can be
    /// in flight from async callers at once.
    pub async fn answer(&self, query: &str, top_k: Option<usize>) -> Result<Answer> {
        let pipeline = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || pipeline.answer_blocking(&query, top_k))
            .await
            .map_err(|e| Error::Operation(format!("answer task failed: {e}")))?
    }

    /// Swap in the index currently persisted in the configured directory.
    pub fn reload_index(&self) -> Result<()> {
        let dir = self
            .index_dir
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("no index directory configured".to_string()))?;
        let dim = self.index().dim();
        self.index().reload(dir, dim)?;
        info!("Pipeline now serving {} passages", self.index().len());
        Ok(())
    }
}
