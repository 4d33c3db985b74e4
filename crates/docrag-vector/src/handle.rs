//! Process-wide handle to the serving index.
//!
//! Readers take an `Arc` snapshot and search it without holding the lock, so
//! queries never wait on each other. Writers get exclusive access; `add`
//! copies the index first when snapshots are still outstanding.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use docrag_core::{Passage, Result, SearchHit};

use crate::index::VectorIndex;

#[derive(Debug)]
pub struct SharedIndex {
    inner: RwLock<Arc<VectorIndex>>,
}

impl SharedIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self { inner: RwLock::new(Arc::new(index)) }
    }

    pub fn snapshot(&self) -> Arc<VectorIndex> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.snapshot().search(query, top_k)
    }

    pub fn add(&self, passage: Passage, embedding: &[f32]) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *guard).add(passage, embedding)
    }

    /// Replace the serving index; returns the previous one.
    pub fn swap(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(index))
    }

    /// Load `dir` and swap it in. On failure the current index keeps serving.
    pub fn reload(&self, dir: &Path, dim: usize) -> Result<()> {
        let index = VectorIndex::load(dir, dim)?;
        let count = index.len();
        self.swap(index);
        info!("Reloaded index from {} ({} passages)", dir.display(), count);
        Ok(())
    }

    pub fn len(&self) -> usize { self.snapshot().len() }
    pub fn is_empty(&self) -> bool { self.snapshot().is_empty() }
    pub fn dim(&self) -> usize { self.snapshot().dim() }
}
