//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RAG__RETRIEVAL__DEFAULT_K=5`).
//! Typed retrieval settings live under the `rag` key and fall back to
//! defaults field by field.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.rag_settings()?.validate()?;
        Ok(config)
    }

    /// Builds a config from an already assembled figment (used by tests and
    /// embedders of the library that manage their own providers).
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config = Self { figment };
        config.rag_settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn rag_settings(&self) -> Result<RagSettings> {
        if !self.figment.contains("rag") {
            return Ok(RagSettings::default());
        }
        self.get("rag")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in words.
    pub chunk_size: usize,
    /// Words shared by consecutive windows.
    pub overlap: usize,
    /// A window is kept only if its joined text is longer than this.
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 200, min_chunk_chars: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub k1: f32,
    pub b: f32,
    pub remove_stop_words: bool,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, remove_stop_words: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub min_confidence: f32,
    pub rerank: bool,
    /// Each side is asked for `k * oversample` candidates before fusion.
    pub oversample: usize,
    /// Weight of the vector side for chunks found by both sides.
    pub vector_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_k: 10, min_confidence: 0.1, rerank: true, oversample: 2, vector_weight: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationConfig {
    pub excerpt_chars: usize,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self { excerpt_chars: 200 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Hash,
    Bert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub dimension: usize,
    pub model_dir: Option<String>,
    pub batch_size: usize,
    /// Most vectors the embedding cache keeps; oldest entries are evicted first.
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { provider: EmbeddingProviderKind::Hash, dimension: 384, model_dir: None, batch_size: 32, cache_capacity: 50_000 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunking: ChunkingConfig,
    pub lexical: LexicalConfig,
    pub retrieval: RetrievalConfig,
    pub citation: CitationConfig,
    pub embedding: EmbeddingConfig,
}

impl RagSettings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if !(0.0..=1.0).contains(&self.retrieval.vector_weight) {
            return Err(Error::InvalidConfig(format!(
                "vector_weight must be within [0, 1], got {}",
                self.retrieval.vector_weight
            )));
        }
        if self.retrieval.oversample == 0 {
            return Err(Error::InvalidConfig("oversample must be at least 1".into()));
        }
        if self.lexical.k1 < 0.0 || !(0.0..=1.0).contains(&self.lexical.b) {
            return Err(Error::InvalidConfig(format!(
                "BM25 parameters out of range: k1={} b={}",
                self.lexical.k1, self.lexical.b
            )));
        }
        if self.embedding.dimension == 0 || self.embedding.batch_size == 0 || self.embedding.cache_capacity == 0 {
            return Err(Error::InvalidConfig("embedding dimension, batch_size and cache_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
