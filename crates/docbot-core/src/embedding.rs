//! Embedding provider trait and the similarity function.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the deterministic [`hash_embedding`] used as a degraded-mode
//! fallback, and [`cosine_similarity`].
//!
//! Network-backed providers (OpenAI, Ollama, fastembed) live in the
//! `docbot` app crate.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Dimensionality of [`hash_embedding`] vectors.
pub const HASH_EMBEDDING_DIMS: usize = 384;

/// Model name reported by [`HashEmbedder`] and tagged on hash vectors.
pub const HASH_EMBEDDING_MODEL: &str = "hash-384";

/// Per-word contribution to each vector component.
const HASH_WEIGHT: f32 = 0.01;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a given model: stored chunk
/// vectors are compared against freshly embedded queries indefinitely.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, in input order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially. Backends with native batching override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Word-hash embedding. Pure, deterministic, and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        HASH_EMBEDDING_MODEL
    }

    fn dims(&self) -> usize {
        HASH_EMBEDDING_DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text))
    }
}

/// Map text to a fixed-length vector by hashing its words.
///
/// Each lowercase whitespace-separated word is hashed with SHA-256; the
/// low 32 bits of the digest's leading 128-bit integer switch on component
/// `j` when bit `j % 32` is set. The sum is L2-normalized.
///
/// This captures word overlap, not meaning. Synonym-rich queries behave
/// arbitrarily; prefer a semantic provider whenever one is available.
pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; HASH_EMBEDDING_DIMS];

    for word in text.to_lowercase().split_whitespace() {
        let digest = Sha256::digest(word.as_bytes());
        let mut head = [0u8; 16];
        head.copy_from_slice(&digest[..16]);
        let hash = u128::from_be_bytes(head);

        for (j, component) in vector.iter_mut().enumerate() {
            if (hash >> (j % 32)) & 1 == 1 {
                *component += HASH_WEIGHT;
            }
        }
    }

    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for component in vector.iter_mut() {
            *component /= magnitude;
        }
    }

    vector
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or when
/// either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}
