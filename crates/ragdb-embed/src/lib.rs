//! ragdb-embed
//!
//! Embedding providers. The feature-hashing embedder is always available;
//! the BERT embedder needs the `candle` feature and a local model directory.
use std::sync::Arc;
use tracing::info;

use ragdb_core::config::{EmbeddingConfig, EmbeddingProviderKind};
use ragdb_core::error::Result;
use ragdb_core::traits::EmbeddingProvider;

pub mod hash;
#[cfg(feature = "candle")]
pub mod bert;
#[cfg(feature = "candle")]
pub mod device;
#[cfg(feature = "candle")]
pub mod pool;
#[cfg(feature = "candle")]
pub mod tokenize;

pub use hash::HashEmbedder;
#[cfg(feature = "candle")]
pub use bert::BertEmbedder;
#[cfg(feature = "candle")]
pub use pool::masked_mean_l2;

/// Builds the provider named by the config. `APP_USE_FAKE_EMBEDDINGS=1`
/// forces the hash embedder regardless of the configured kind.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || config.provider == EmbeddingProviderKind::Hash {
        info!(dim = config.dimension, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(config.dimension)?));
    }
    load_bert(config)
}

#[cfg(feature = "candle")]
fn load_bert(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    use ragdb_core::config::expand_path;
    use ragdb_core::error::Error;

    let dir = config
        .model_dir
        .as_deref()
        .map(expand_path)
        .ok_or_else(|| Error::InvalidConfig("embedding.model_dir is required for the bert provider".into()))?;
    let embedder = BertEmbedder::load(&dir)?;
    if embedder.dim() != config.dimension {
        return Err(Error::DimensionMismatch {
            expected: config.dimension,
            actual: embedder.dim(),
            context: format!("hidden size of model in {}", dir.display()),
        });
    }
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "candle"))]
fn load_bert(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(ragdb_core::error::Error::InvalidConfig(
        "the bert embedding provider requires building ragdb-embed with the `candle` feature".into(),
    ))
}
