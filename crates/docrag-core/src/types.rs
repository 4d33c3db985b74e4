//! Domain types shared by the embedder, the vector index and the retrieval layer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type PassageId = u64;

/// A fixed-length vector produced by an embedding model.
pub type Embedding = Vec<f32>;

/// The smallest retrievable unit of corpus text.
///
/// `id` is the passage's ordinal position inside the index that owns it, so
/// passage `i` always pairs with vector `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub text: String,
}

impl Passage {
    pub fn new(id: PassageId, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

/// One ranked search result. `distance` is the squared Euclidean distance to
/// the query vector; lower is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub passage: Passage,
    pub distance: f32,
}

/// A document handed to ingestion: a display name and its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub name: String,
    pub text: String,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// What ingestion does when a single passage cannot be embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Abort the whole run on the first failure.
    #[default]
    Strict,
    /// Skip the passage, log it, and keep going.
    Lenient,
}

/// How document text is cut into passages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// One passage per non-empty line.
    #[default]
    Lines,
    /// Blank-line separated paragraphs, long ones split into overlapping word windows.
    Paragraphs,
}

/// Reject vectors that would poison the index: empty output, wrong dimension,
/// or any NaN/Inf component.
pub fn validate_embedding(expected_dim: usize, vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::EmbeddingFailure("model returned an empty vector".to_string()));
    }
    if vector.len() != expected_dim {
        return Err(Error::EmbeddingFailure(format!(
            "model returned {} components, expected {}",
            vector.len(),
            expected_dim
        )));
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(Error::EmbeddingFailure(format!("component {pos} is not finite")));
    }
    Ok(())
}
