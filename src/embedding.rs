//! Embedding provider implementations.
//!
//! Concrete backends for the core [`EmbeddingProvider`] trait:
//! - **[`HashEmbedder`]**: deterministic word-hash vectors; no network.
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings` with batching and retry.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed`.
//! - **`LocalEmbedder`**: fastembed models run in-process (feature
//!   `local-embeddings-fastembed`).
//! - **[`FallbackEmbedder`]**: wraps a provider and degrades to the hash
//!   embedding when it fails, tagging each vector with its model.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use docbot::config::EmbeddingConfig;
//! # use docbot::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "hash"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "hash-384");
//! ```
//!
//! Vectors from different providers are not comparable. The store keeps
//! the model name next to every vector and re-embeds chunks whose model
//! differs from the configured one.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

pub use docbot_core::embedding::{
    cosine_similarity, hash_embedding, EmbeddingProvider, HashEmbedder, HASH_EMBEDDING_DIMS,
    HASH_EMBEDDING_MODEL,
};

use crate::config::EmbeddingConfig;
use crate::http;

// ============ OpenAI ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            api_key,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json_with_retry(
            &self.client,
            "https://api.openai.com/v1/embeddings",
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json_with_retry(
            &self.client,
            &format!("{}/api/embed", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

// ============ Local (fastembed) ============

/// In-process embeddings via fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached;
/// after that no network calls are made.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    model: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        // Validate the name eagerly so a typo fails at startup.
        config_to_fastembed_model(&model_name)?;
        let dims = config.dims.unwrap_or(match model_name.as_str() {
            "bge-base-en-v1.5" | "nomic-embed-text-v1.5" => 768,
            _ => 384,
        });
        Ok(Self {
            model_name,
            dims,
            model: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let fastembed_model = config_to_fastembed_model(&self.model_name)?;
        let slot = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock().map_err(|_| anyhow!("local embedder lock poisoned"))?;
            if guard.is_none() {
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
                )
                .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;
                *guard = Some(model);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| anyhow!("local embedding model unavailable"))?;
            model
                .embed(texts, None)
                .map_err(|e| anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

// ============ Fallback ============

/// A vector and the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
}

impl Embedding {
    fn hash(text: &str) -> Self {
        Self {
            vector: hash_embedding(text),
            model: HASH_EMBEDDING_MODEL.to_string(),
        }
    }
}

/// A provider with the hash embedding as a safety net.
///
/// When the primary provider errors, the failure is logged and the text is
/// embedded with [`hash_embedding`] instead. Every result is tagged with the
/// model that produced it, so callers never compare vectors across spaces.
pub struct FallbackEmbedder {
    primary: Arc<dyn EmbeddingProvider>,
}

impl FallbackEmbedder {
    pub fn new(primary: Arc<dyn EmbeddingProvider>) -> Self {
        Self { primary }
    }

    pub fn primary(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.primary
    }

    pub fn model_name(&self) -> &str {
        self.primary.model_name()
    }

    pub fn dims(&self) -> usize {
        self.primary.dims()
    }

    /// True when the primary provider is itself the hash embedding.
    pub fn is_hash(&self) -> bool {
        self.primary.model_name() == HASH_EMBEDDING_MODEL
    }

    pub async fn embed(&self, text: &str) -> Embedding {
        match self.primary.embed(text).await {
            Ok(vector) => Embedding {
                vector,
                model: self.primary.model_name().to_string(),
            },
            Err(e) => {
                tracing::warn!(
                    model = self.primary.model_name(),
                    error = %e,
                    "embedding provider failed, using hash fallback"
                );
                Embedding::hash(text)
            }
        }
    }

    /// Embed `texts` in one call. The whole batch falls back together, so
    /// all results share one model.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Embedding> {
        match self.primary.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                let model = self.primary.model_name();
                vectors
                    .into_iter()
                    .map(|vector| Embedding {
                        vector,
                        model: model.to_string(),
                    })
                    .collect()
            }
            Ok(vectors) => {
                tracing::warn!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "embedding batch size mismatch, using hash fallback"
                );
                texts.iter().map(|t| Embedding::hash(t)).collect()
            }
            Err(e) => {
                tracing::warn!(
                    model = self.primary.model_name(),
                    error = %e,
                    batch = texts.len(),
                    "embedding provider failed, using hash fallback"
                );
                texts.iter().map(|t| Embedding::hash(t)).collect()
            }
        }
    }
}

/// Create the [`EmbeddingProvider`] named by the configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"hash"` | [`HashEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` |
///
/// The store wraps whatever is returned in a [`FallbackEmbedder`].
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match config.provider.as_str() {
        "hash" => Arc::new(HashEmbedder),
        "openai" => Arc::new(OpenAIEmbedder::new(config)?),
        "ollama" => Arc::new(OllamaEmbedder::new(config)?),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Arc::new(LocalEmbedder::new(config)?),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-fastembed"),
        other => bail!("Unknown embedding provider: {}", other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            HASH_EMBEDDING_DIMS
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            bail!("provider offline")
        }
    }

    #[tokio::test]
    async fn test_fallback_tags_hash_vectors_on_error() {
        let embedder = FallbackEmbedder::new(Arc::new(FailingEmbedder));
        let e = embedder.embed("minimum stake").await;
        assert_eq!(e.vector, hash_embedding("minimum stake"));
        assert_eq!(e.model, HASH_EMBEDDING_MODEL);
        assert_eq!(embedder.model_name(), "failing");

        let batch = embedder
            .embed_batch(&["a b".to_string(), "c".to_string()])
            .await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].vector, hash_embedding("c"));
        assert!(batch.iter().all(|e| e.model == HASH_EMBEDDING_MODEL));
    }

    #[tokio::test]
    async fn test_fallback_tags_primary_vectors() {
        let embedder = FallbackEmbedder::new(Arc::new(HashEmbedder));
        assert!(embedder.is_hash());
        let e = embedder.embed("stake").await;
        assert_eq!(e.model, HASH_EMBEDDING_MODEL);
        assert!(!FallbackEmbedder::new(Arc::new(FailingEmbedder)).is_hash());
    }

    #[test]
    fn test_create_hash_embedder() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "hash-384");
        assert_eq!(embedder.dims(), HASH_EMBEDDING_DIMS);
    }

    #[test]
    fn test_parse_openai_response_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({"embeddings": [[0.5, 0.5]]});
        assert_eq!(parse_ollama_response(&json).unwrap(), vec![vec![0.5, 0.5]]);
        assert!(parse_ollama_response(&serde_json::json!({})).is_err());
    }
}
