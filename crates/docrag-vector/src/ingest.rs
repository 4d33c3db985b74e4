//! Corpus ingestion: split documents into passages, embed the distinct texts
//! in batches, then append passages to a fresh index with the next ordinal id.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use docrag_core::data_processor::{ChunkingConfig, DataProcessor};
use docrag_core::{validate_embedding, Embedder, Embedding, Error, IngestMode, Passage, RawDocument, Result};

use crate::index::VectorIndex;

/// A passage that lenient ingestion left out.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPassage {
    pub document: String,
    /// Position of the passage within its document.
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub index: VectorIndex,
    pub documents: usize,
    pub passages_seen: usize,
    pub skipped: Vec<SkippedPassage>,
    /// Passages whose text was already embedded earlier in the same run.
    pub cache_hits: usize,
}

impl IngestReport {
    pub fn indexed(&self) -> usize { self.index.len() }
}

/// Passages per `embed_batch` call unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub struct Ingestor<'a> {
    embedder: &'a dyn Embedder,
    mode: IngestMode,
    processor: DataProcessor,
    batch_size: usize,
    show_progress: bool,
}

/// One passage in document order, pointing at the slot of its distinct text.
struct PendingPassage<'d> {
    document: &'d str,
    position: usize,
    text: &'d str,
    slot: usize,
}

impl<'a> Ingestor<'a> {
    pub fn new(embedder: &'a dyn Embedder, mode: IngestMode) -> Self {
        Self { embedder, mode, processor: DataProcessor::new(), batch_size: DEFAULT_BATCH_SIZE, show_progress: false }
    }

    pub fn with_chunking(mut self, config: ChunkingConfig) -> Self {
        self.processor = DataProcessor::with_config(config);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn ingest(&self, documents: &[RawDocument], vector_dim: usize) -> Result<IngestReport> {
        if self.embedder.dim() != vector_dim {
            return Err(Error::DimensionMismatch { expected: vector_dim, actual: self.embedder.dim() });
        }
        let mut index = VectorIndex::new(vector_dim)?.with_embedder_id(self.embedder.embedder_id());

        let split: Vec<(&RawDocument, Vec<String>)> =
            documents.iter().map(|doc| (doc, self.processor.split(&doc.text))).collect();
        let total: usize = split.iter().map(|(_, passages)| passages.len()).sum();
        info!("Ingesting {} passages from {} documents ({:?} mode)", total, documents.len(), self.mode);

        // Identical texts share one slot and are embedded once.
        let mut slots: HashMap<blake3::Hash, usize> = HashMap::new();
        let mut distinct: Vec<&str> = Vec::new();
        let mut pending = Vec::with_capacity(total);
        for (doc, passages) in &split {
            for (position, text) in passages.iter().enumerate() {
                let slot = *slots.entry(blake3::hash(text.as_bytes())).or_insert_with(|| {
                    distinct.push(text.as_str());
                    distinct.len() - 1
                });
                pending.push(PendingPassage { document: doc.name.as_str(), position, text: text.as_str(), slot });
            }
        }

        let pb = self.progress_bar(distinct.len() as u64);
        let mut embedded: Vec<std::result::Result<Embedding, String>> = Vec::with_capacity(distinct.len());
        for chunk in distinct.chunks(self.batch_size) {
            match self.embed_chunk(chunk) {
                Ok(vectors) => embedded.extend(vectors.into_iter().map(Ok)),
                Err(e) if self.mode == IngestMode::Lenient => {
                    warn!("Batch of {} passages failed ({}); retrying one at a time", chunk.len(), e);
                    embedded.extend(chunk.iter().map(|text| self.embed_one(text).map_err(|e| e.to_string())));
                }
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
            pb.inc(chunk.len() as u64);
        }

        let mut skipped = Vec::new();
        let mut cache_hits = 0usize;
        let mut used = vec![false; distinct.len()];
        for passage in pending {
            match &embedded[passage.slot] {
                Ok(embedding) => {
                    if std::mem::replace(&mut used[passage.slot], true) {
                        cache_hits += 1;
                    }
                    let id = index.len() as u64;
                    if let Err(e) = index.add(Passage::new(id, passage.text), embedding) {
                        pb.abandon();
                        return Err(e);
                    }
                }
                Err(reason) => {
                    warn!("Skipping passage {} of {}: {}", passage.position, passage.document, reason);
                    skipped.push(SkippedPassage {
                        document: passage.document.to_string(),
                        position: passage.position,
                        reason: reason.clone(),
                    });
                }
            }
        }
        pb.finish_and_clear();

        info!(
            "Ingestion finished: {} indexed, {} skipped, {} served from cache",
            index.len(),
            skipped.len(),
            cache_hits
        );
        Ok(IngestReport { index, documents: documents.len(), passages_seen: total, skipped, cache_hits })
    }

    /// One `embed_batch` call; any bad vector fails the whole chunk.
    fn embed_chunk(&self, chunk: &[&str]) -> Result<Vec<Embedding>> {
        let texts: Vec<String> = chunk.iter().map(|t| t.to_string()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingFailure(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        for v in &vectors {
            validate_embedding(self.embedder.dim(), v)?;
        }
        Ok(vectors)
    }

    fn embed_one(&self, text: &str) -> Result<Embedding> {
        let v = self.embedder.embed(text)?;
        validate_embedding(self.embedder.dim(), &v)?;
        Ok(v)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} passages ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
