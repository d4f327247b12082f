//! TOML configuration parsing and validation.
//!
//! Every section except `[storage]` is optional; missing fields fall back
//! to the defaults below. [`load_config`] rejects out-of-range values up
//! front so the engine never starts half-configured.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl Config {
    /// A config rooted at `data_dir` with every other section defaulted.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                data_dir: data_dir.into(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding `documents.json` and `project_settings.json`.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("project_settings.json")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_confidence_threshold() -> f32 {
    0.30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// True when a semantic provider is configured (anything but `hash`).
    pub fn is_semantic(&self) -> bool {
        self.provider != "hash"
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Override for the chat completions base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
            api_key_env: None,
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_max_retries(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "openai" => "https://api.openai.com/v1".to_string(),
            _ => "https://api.groq.com/openai/v1".to_string(),
        }
    }

    pub fn resolved_api_key_env(&self) -> String {
        if let Some(var) = &self.api_key_env {
            return var.clone();
        }
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY".to_string(),
            "openai-compatible" => "LLM_API_KEY".to_string(),
            _ => "GROQ_API_KEY".to_string(),
        }
    }
}

fn default_llm_provider() -> String {
    "groq".to_string()
}
fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    20
}
fn default_max_tokens() -> u32 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    #[serde(default = "default_repeat_reset_secs")]
    pub repeat_reset_secs: u64,
    #[serde(default = "default_closing_probability")]
    pub closing_probability: f64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_size: default_cache_size(),
            duplicate_threshold: default_duplicate_threshold(),
            repeat_reset_secs: default_repeat_reset_secs(),
            closing_probability: default_closing_probability(),
        }
    }
}

impl ConversationConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        bounded_secs(self.cooldown_secs)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        bounded_secs(self.cache_ttl_secs)
    }

    pub fn repeat_reset(&self) -> chrono::Duration {
        bounded_secs(self.repeat_reset_secs)
    }
}

/// Seconds as a chrono duration, clamped to [`MAX_DURATION_SECS`].
fn bounded_secs(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

fn default_cooldown_secs() -> u64 {
    15
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_cache_size() -> usize {
    50
}
fn default_duplicate_threshold() -> f64 {
    0.80
}
fn default_repeat_reset_secs() -> u64 {
    600
}
fn default_closing_probability() -> f64 {
    0.3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Upper bound for every `*_secs` setting (ten years).
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn check_secs(name: &str, value: u64) -> Result<()> {
    if value > MAX_DURATION_SECS {
        bail!("{} must be <= {} seconds, got {}", name, MAX_DURATION_SECS, value);
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.chunk_overlap ({}) must be less than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.confidence_threshold) {
        bail!("retrieval.confidence_threshold must be in [-1.0, 1.0]");
    }

    // Embedding
    match config.embedding.provider.as_str() {
        "hash" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be hash, openai, ollama, or local.",
            other
        ),
    }
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    // LLM
    match config.llm.provider.as_str() {
        "groq" | "openai" => {}
        "openai-compatible" => {
            if config.llm.base_url.is_none() {
                bail!("llm.base_url is required when provider is 'openai-compatible'");
            }
        }
        other => bail!(
            "Unknown llm provider: '{}'. Must be groq, openai, or openai-compatible.",
            other
        ),
    }
    if config.llm.max_tokens == 0 {
        bail!("llm.max_tokens must be > 0");
    }
    if config.llm.timeout_secs == 0 {
        bail!("llm.timeout_secs must be > 0");
    }
    check_secs("llm.timeout_secs", config.llm.timeout_secs)?;
    check_secs("embedding.timeout_secs", config.embedding.timeout_secs)?;

    // Conversation
    let conv = &config.conversation;
    if conv.cache_size == 0 {
        bail!("conversation.cache_size must be >= 1");
    }
    if !(0.0..=1.0).contains(&conv.duplicate_threshold) {
        bail!("conversation.duplicate_threshold must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&conv.closing_probability) {
        bail!("conversation.closing_probability must be in [0.0, 1.0]");
    }
    check_secs("conversation.cooldown_secs", conv.cooldown_secs)?;
    check_secs("conversation.cache_ttl_secs", conv.cache_ttl_secs)?;
    check_secs("conversation.repeat_reset_secs", conv.repeat_reset_secs)?;

    Ok(())
}
