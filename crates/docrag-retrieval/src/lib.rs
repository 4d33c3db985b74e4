//! docrag-retrieval
//!
//! Query-time side of the system: build the retrieval context for a question
//! and hand it to a generator.

pub mod context;
pub mod generation;
pub mod pipeline;

pub use context::{render_context, RetrievalContextBuilder, RetrievedContext};
pub use generation::OllamaGenerator;
pub use pipeline::{Answer, RagPipeline};
