//! Exact in-memory nearest-neighbour index over passage embeddings.
//!
//! Vectors live in one contiguous row-major buffer; row `i` belongs to
//! passage `i`. Search is a single linear scan with a bounded max-heap, so
//! results are exact and reproducible for a given index.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use docrag_core::{Embedding, Error, Passage, PassageId, Result, SearchHit};

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    passages: Vec<Passage>,
    vectors: Vec<f32>,
    embedder_id: Option<String>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::IndexBuild("vector dimension must be positive".to_string()));
        }
        Ok(Self { dim, passages: Vec::new(), vectors: Vec::new(), embedder_id: None })
    }

    /// Assemble an index from already-computed embeddings. Nothing is embedded
    /// here; every input is checked and the first inconsistency is reported.
    pub fn build(dim: usize, passages: Vec<Passage>, embeddings: Vec<Embedding>) -> Result<Self> {
        let mut index = Self::new(dim)?;
        if passages.len() != embeddings.len() {
            return Err(Error::IndexBuild(format!(
                "{} passages but {} embeddings",
                passages.len(),
                embeddings.len()
            )));
        }
        index.passages.reserve(passages.len());
        index.vectors.reserve(passages.len() * dim);
        for (passage, embedding) in passages.into_iter().zip(embeddings) {
            index.add(passage, &embedding).map_err(|e| match e {
                Error::DimensionMismatch { expected, actual } => {
                    Error::IndexBuild(format!("embedding has {actual} components, expected {expected}"))
                }
                other => other,
            })?;
        }
        Ok(index)
    }

    pub fn with_embedder_id(mut self, embedder_id: impl Into<String>) -> Self {
        self.embedder_id = Some(embedder_id.into());
        self
    }

    pub fn set_embedder_id(&mut self, embedder_id: Option<String>) { self.embedder_id = embedder_id; }

    /// Append one passage and its vector. On error the index is unchanged.
    pub fn add(&mut self, passage: Passage, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: embedding.len() });
        }
        if let Some(pos) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(Error::IndexBuild(format!("passage {}: component {pos} is not finite", passage.id)));
        }
        let next_id = self.passages.len() as PassageId;
        if passage.id != next_id {
            return Err(Error::IndexBuild(format!("passage id {} out of order, expected {next_id}", passage.id)));
        }
        self.vectors.extend_from_slice(embedding);
        self.passages.push(passage);
        Ok(())
    }

    /// The `top_k` passages closest to `query` by squared Euclidean distance,
    /// ascending; equal distances are ordered by passage id. The query must be
    /// finite.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if let Some(pos) = query.iter().position(|x| !x.is_finite()) {
            return Err(Error::InvalidQuery(format!("query component {pos} is not finite")));
        }
        if top_k == 0 || self.passages.is_empty() {
            return Ok(Vec::new());
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(top_k.min(self.len()) + 1);
        for (row, vector) in self.vectors.chunks_exact(self.dim).enumerate() {
            let candidate = Candidate { distance: squared_l2(query, vector), row };
            if heap.len() < top_k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchHit { passage: self.passages[c.row].clone(), distance: c.distance })
            .collect())
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.passages.len() }
    pub fn is_empty(&self) -> bool { self.passages.is_empty() }
    pub fn passages(&self) -> &[Passage] { &self.passages }
    pub fn passage(&self, id: PassageId) -> Option<&Passage> { self.passages.get(usize::try_from(id).ok()?) }
    pub fn embedder_id(&self) -> Option<&str> { self.embedder_id.as_deref() }

    /// Stored vector for passage `id`.
    pub fn vector(&self, id: PassageId) -> Option<&[f32]> {
        let row = usize::try_from(id).ok()?;
        if row >= self.len() { return None; }
        Some(&self.vectors[row * self.dim..(row + 1) * self.dim])
    }

    pub(crate) fn raw_vectors(&self) -> &[f32] { &self.vectors }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Heap entry ordered by distance, then by row (== passage id).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    row: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.row.cmp(&other.row))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Candidate {}
