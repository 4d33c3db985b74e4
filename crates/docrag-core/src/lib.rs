//! docrag-core
//!
//! Shared domain types, the embedding/generation capabilities, the error
//! taxonomy, configuration, and document splitting.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Embedder, Generator};
pub use types::{
    validate_embedding, ChunkingStrategy, Embedding, IngestMode, Passage, PassageId, RawDocument, SearchHit,
};
