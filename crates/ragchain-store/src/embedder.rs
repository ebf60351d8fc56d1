//! Embedding backend trait and implementations.
//!
//! The `EmbedderBackend` trait abstracts over embedding generation.
//! Implementations:
//! - `HashEmbedder`: feature-hashed bag of words, no model files needed

use ndarray::Array1;
use ragchain_core::{Error, Result};
use sha2::{Digest, Sha256};

/// Default embedding dimension.
pub const DEFAULT_DIM: usize = 384;

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    fn embed(&self, text: &str) -> Result<Array1<f32>>;

    /// Generate embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Feature-hashing embedder.
///
/// Each lowercased alphanumeric token is hashed (SHA-256) into one of `dim`
/// buckets with a hash-derived sign, then the vector is L2-normalised.
/// Texts sharing vocabulary land close together under cosine similarity.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl EmbedderBackend for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Array1<f32>> {
        if self.dim == 0 {
            return Err(Error::Embedding("embedding dimension must be > 0".into()));
        }

        let mut embedding = Array1::<f32>::zeros(self.dim);
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let norm = embedding.dot(&embedding).sqrt();
        if norm > 0.0 {
            embedding.mapv_inplace(|v| v / norm);
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
