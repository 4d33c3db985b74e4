//! Turn a query into the context block handed to the generator.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use docrag_core::{validate_embedding, Embedder, Error, Result, SearchHit};
use docrag_vector::SharedIndex;

/// Ranked hits for one query plus the rendered prompt text.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    query: String,
    hits: Vec<SearchHit>,
    text: String,
}

impl RetrievedContext {
    fn new(query: &str, hits: Vec<SearchHit>) -> Self {
        let text = render_context(query, &hits);
        Self { query: query.to_string(), hits, text }
    }

    pub fn as_str(&self) -> &str { &self.text }
    pub fn query(&self) -> &str { &self.query }
    pub fn hits(&self) -> &[SearchHit] { &self.hits }
    /// True when no passage was retrieved; the prompt then carries an empty context.
    pub fn is_empty(&self) -> bool { self.hits.is_empty() }
    pub fn into_string(self) -> String { self.text }
}

impl fmt::Display for RetrievedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.text) }
}

/// `Context:\n{texts joined by \n}\n\nQuestion: {query}\n\nAnswer:`
pub fn render_context(query: &str, hits: &[SearchHit]) -> String {
    let joined = hits.iter().map(|h| h.passage.text.as_str()).collect::<Vec<_>>().join("\n");
    format!("Context:\n{joined}\n\nQuestion: {query}\n\nAnswer:")
}

#[derive(Clone)]
pub struct RetrievalContextBuilder {
    embedder: Arc<dyn Embedder>,
    index: Arc<SharedIndex>,
    require_results: bool,
}

impl RetrievalContextBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<SharedIndex>) -> Self {
        Self { embedder, index, require_results: false }
    }

    /// Fail with `EmptyCorpus` rather than build a context from zero passages.
    pub fn with_require_results(mut self, require_results: bool) -> Self {
        self.require_results = require_results;
        self
    }

    pub fn index(&self) -> &Arc<SharedIndex> { &self.index }

    pub fn build_context(&self, query: &str, top_k: usize) -> Result<RetrievedContext> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery("query is empty".to_string()));
        }
        if top_k == 0 {
            return Err(Error::InvalidQuery("top_k must be positive".to_string()));
        }

        let index = self.index.snapshot();
        if self.embedder.dim() != index.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), actual: self.embedder.dim() });
        }
        let query_vector = self.embedder.embed(query)?;
        validate_embedding(index.dim(), &query_vector)?;

        let hits = index.search(&query_vector, top_k)?;
        debug!(
            query,
            top_k,
            hits = hits.len(),
            distances = ?hits.iter().map(|h| h.distance).collect::<Vec<_>>(),
            "retrieved passages"
        );
        if hits.is_empty() && self.require_results {
            return Err(Error::EmptyCorpus);
        }
        Ok(RetrievedContext::new(query, hits))
    }
}
