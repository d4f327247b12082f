//! Core data models used throughout DocBot.
//!
//! These types represent the chunks, search results, cached answers and
//! per-tenant settings that flow through retrieval and the chat engine.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant assigned to chunks persisted before tenants existed.
pub const DEFAULT_TENANT: &str = "default";

fn default_tenant() -> String {
    DEFAULT_TENANT.to_string()
}

/// A chunk produced by ingestion, before it is stored.
///
/// `vector` is optional: the store embeds the text when it is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
    pub vector: Option<Vec<f32>>,
}

impl NewChunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            chunk_index,
            vector: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}

/// A stored unit of knowledge, owned by the tenant store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default = "unknown_source")]
    pub source: String,
    #[serde(default)]
    pub chunk_index: usize,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
    /// Older snapshots called this field `embedding`.
    #[serde(alias = "embedding")]
    pub vector: Vec<f32>,
    /// Model that produced `vector`. Absent in older snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Chunk {
    /// Whether `vector` lives in the space of the model `model_name` with
    /// `dims` dimensions. Untagged vectors are matched by length.
    pub fn is_embedded_with(&self, model_name: &str, dims: usize) -> bool {
        if self.vector.is_empty() {
            return false;
        }
        match &self.model {
            Some(m) => m == model_name,
            None => self.vector.len() == dims,
        }
    }
}

fn unknown_source() -> String {
    "unknown".to_string()
}

/// A chunk scored against a query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub source: String,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub similarity: f32,
}

/// Per-tenant inventory returned by the store's tenant listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantSummary {
    pub tenant_id: String,
    pub doc_count: usize,
    /// Distinct source identifiers, sorted.
    pub sources: Vec<String>,
}

/// A delivered answer remembered for duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedAnswer {
    pub question: String,
    pub answer: String,
    pub tenant_id: String,
    /// Platform-specific reference (message link or id) to the answer.
    pub message_ref: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Response style configured per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneMode {
    #[default]
    Casual,
    Neutral,
    Professional,
}

impl ToneMode {
    pub const ALL: [ToneMode; 3] = [ToneMode::Casual, ToneMode::Neutral, ToneMode::Professional];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToneMode::Casual => "casual",
            ToneMode::Neutral => "neutral",
            ToneMode::Professional => "professional",
        }
    }

    /// Sampling temperature for generation. Stricter tones run colder.
    pub fn temperature(&self) -> f32 {
        match self {
            ToneMode::Casual => 0.5,
            ToneMode::Neutral => 0.4,
            ToneMode::Professional => 0.3,
        }
    }
}

impl fmt::Display for ToneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToneMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "casual" => Ok(ToneMode::Casual),
            "neutral" => Ok(ToneMode::Neutral),
            "professional" => Ok(ToneMode::Professional),
            other => bail!(
                "Unknown tone mode: '{}'. Must be casual, neutral, or professional.",
                other
            ),
        }
    }
}

/// Token counters reported by a generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub requests: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.requests += other.requests;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_parse() {
        assert_eq!("Casual".parse::<ToneMode>().unwrap(), ToneMode::Casual);
        assert_eq!(" professional ".parse::<ToneMode>().unwrap(), ToneMode::Professional);
        assert!("sarcastic".parse::<ToneMode>().is_err());
    }

    #[test]
    fn test_tone_serde_lowercase() {
        let json = serde_json::to_string(&ToneMode::Neutral).unwrap();
        assert_eq!(json, "\"neutral\"");
    }

    #[test]
    fn test_chunk_without_tenant_gets_default() {
        let json = r#"{"text":"hello","source":"faq","chunk_index":0,"embedding":[1.0,0.0]}"#;
        let chunk: Chunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.tenant_id, DEFAULT_TENANT);
        assert_eq!(chunk.vector, vec![1.0, 0.0]);
        assert_eq!(chunk.model, None);
    }

    #[test]
    fn test_chunk_embedding_space() {
        let mut chunk = Chunk {
            text: "hello".to_string(),
            source: "faq".to_string(),
            chunk_index: 0,
            tenant_id: DEFAULT_TENANT.to_string(),
            vector: vec![1.0, 0.0],
            model: None,
        };
        assert!(chunk.is_embedded_with("any", 2));
        assert!(!chunk.is_embedded_with("any", 3));

        chunk.model = Some("hash-384".to_string());
        assert!(chunk.is_embedded_with("hash-384", 384));
        assert!(!chunk.is_embedded_with("text-embedding-3-small", 2));

        chunk.vector.clear();
        assert!(!chunk.is_embedded_with("hash-384", 384));
    }

    #[test]
    fn test_usage_add() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage { input_tokens: 10, output_tokens: 4, requests: 1 });
        total.add(&TokenUsage { input_tokens: 5, output_tokens: 1, requests: 1 });
        assert_eq!(total, TokenUsage { input_tokens: 15, output_tokens: 5, requests: 2 });
    }
}
