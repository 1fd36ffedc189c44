//! Sentence embeddings from a local BERT checkpoint (e.g. all-MiniLM-L6-v2).
//!
//! The model directory must contain `config.json`, `tokenizer.json` and
//! `model.safetensors`. Inference runs on the blocking pool so the async
//! retriever is never stalled by a forward pass.
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use candle_core::Device;
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::EmbeddingProvider;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const MAX_LEN: usize = 256;

struct BertInner {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
}

pub struct BertEmbedder {
    inner: Arc<BertInner>,
    id: String,
    dim: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(Error::InvalidConfig(format!("model directory {} does not exist", model_dir.display())));
        }
        let (inner, dim) = Self::load_inner(model_dir).map_err(|e| Error::embedding("bert", format!("{e:#}")))?;
        let name = model_dir.file_name().map_or_else(|| "bert".to_string(), |n| n.to_string_lossy().into_owned());
        info!(model = %name, dim, "BERT embedder loaded");
        Ok(Self { inner: Arc::new(inner), id: format!("bert:{name}:d{dim}"), dim })
    }

    fn load_inner(model_dir: &Path) -> anyhow::Result<(BertInner, usize)> {
        let device = select_device();
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?)?;
        let weights_path = model_dir.join("model.safetensors");
        let weights = candle_core::safetensors::load(&weights_path, &device).with_context(|| format!("reading {}", weights_path.display()))?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);
        Ok((BertInner { model, tokenizer, device, pad_id }, config.hidden_size))
    }
}

impl BertInner {
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, MAX_LEN, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let elapsed = start.elapsed().as_millis();
        if elapsed > 100 * texts.len() as u128 { warn!(elapsed_ms = elapsed as u64, batch = texts.len(), "slow embedding batch"); }
        debug!(batch = texts.len(), elapsed_ms = elapsed as u64, "embedded batch");
        Ok(out)
    }
}

#[async_trait]
impl EmbeddingProvider for BertEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || inner.embed_batch(&texts))
            .await
            .map_err(|e| Error::embedding(self.id.clone(), format!("embedding task failed: {e}")))?
            .map_err(|e| Error::embedding(self.id.clone(), format!("{e:#}")))
    }
}
