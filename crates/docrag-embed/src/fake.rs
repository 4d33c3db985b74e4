use std::hash::Hasher;

use twox_hash::XxHash64;

use docrag_core::{validate_embedding, Embedder, Embedding, Error, Result};

/// Deterministic feature-hashing embedder: every lowercased alphanumeric token
/// adds a signed weight to one bucket, and the vector is L2-normalised. Texts
/// sharing words land close together. No model, no I/O; used in tests and for
/// offline development.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("fake:xxh64:d{}", dim) }
    }
}

fn token_hash(token: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    hasher.finish()
}

impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Embedding> {
        if self.dim == 0 {
            return Err(Error::EmbeddingFailure("fake embedder has zero dimension".to_string()));
        }
        let mut v = vec![0f32; self.dim];
        let tokens = text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty());
        for token in tokens {
            let h = token_hash(&token.to_lowercase());
            let bucket = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + ((h >> 32) as u32 as f32) / (u32::MAX as f32);
            v[bucket] += sign * weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        validate_embedding(self.dim, &v)?;
        Ok(v)
    }
}
