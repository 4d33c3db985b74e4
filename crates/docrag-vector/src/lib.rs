//! docrag-vector
//!
//! Exact vector index over passage embeddings, its persisted form, the shared
//! serving handle, and the ingestion path that builds it.

pub mod handle;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod schema;

pub use handle::SharedIndex;
pub use index::VectorIndex;
pub use ingest::{IngestReport, Ingestor, SkippedPassage, DEFAULT_BATCH_SIZE};
pub use persist::{read_manifest, Manifest, MANIFEST_FILE};
