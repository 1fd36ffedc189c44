//! Embedding cache keyed by `(embedder_id, content_hash)`.
//!
//! The cache is consulted before calling the wrapped provider and written
//! through on misses, so identical texts are only embedded once per provider.
//! Misses are sent to the provider in batches of at most `batch_size`. At most
//! `capacity` vectors are kept; the oldest insertions are evicted first.
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::EmbeddingProvider;

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

pub const DEFAULT_CAPACITY: usize = 50_000;

type Key = (String, String);

#[derive(Default)]
struct Entries {
    vectors: HashMap<Key, Vec<f32>>,
    order: VecDeque<Key>,
}

impl Entries {
    fn insert(&mut self, key: Key, vector: Vec<f32>, capacity: usize) {
        if self.vectors.insert(key.clone(), vector).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.vectors.remove(&oldest);
            }
        }
    }
}

pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    capacity: usize,
    entries: RwLock<Entries>,
}

impl CachedEmbeddingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self { inner, batch_size: batch_size.max(1), capacity: DEFAULT_CAPACITY, entries: RwLock::new(Entries::default()) }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn len(&self) -> usize { self.entries.read().vectors.len() }

    pub fn is_empty(&self) -> bool { self.entries.read().vectors.is_empty() }

    fn key(&self, hash: &str) -> (String, String) { (self.inner.id().to_string(), hash.to_string()) }

    /// Embeds `texts` with the wrapped provider and checks the shape of what
    /// comes back.
    async fn embed_uncached(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let provider = self.inner.id().to_string();
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.inner.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(provider, format!("returned {} vectors for {} texts", vectors.len(), batch.len())));
            }
            for v in &vectors {
                if v.len() != self.inner.dim() {
                    return Err(Error::DimensionMismatch { expected: self.inner.dim(), actual: v.len(), context: format!("output of {provider}") });
                }
            }
            out.extend(vectors);
        }
        Ok(out)
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    fn id(&self) -> &str { self.inner.id() }
    fn dim(&self) -> usize { self.inner.dim() }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let hashes: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = {
            let entries = self.entries.read();
            hashes.iter().map(|h| entries.vectors.get(&self.key(h)).cloned()).collect()
        };
        let mut miss_idx = Vec::new();
        let mut miss_texts = Vec::new();
        for (i, slot) in out.iter().enumerate() {
            // duplicates within one call are embedded once
            if slot.is_none() && !miss_idx.iter().any(|&j: &usize| hashes[j] == hashes[i]) {
                miss_idx.push(i);
                miss_texts.push(texts[i].clone());
            }
        }
        debug!(provider = self.inner.id(), hits = texts.len() - miss_idx.len(), misses = miss_idx.len(), "embedding cache lookup");
        if !miss_texts.is_empty() {
            let vectors = self.embed_uncached(&miss_texts).await?;
            let fresh: Vec<(&str, Vec<f32>)> = miss_idx.iter().map(|&i| hashes[i].as_str()).zip(vectors).collect();
            {
                let lookup: HashMap<&str, &Vec<f32>> = fresh.iter().map(|(h, v)| (*h, v)).collect();
                for (i, slot) in out.iter_mut().enumerate() {
                    if slot.is_none() { *slot = lookup.get(hashes[i].as_str()).map(|v| (*v).clone()); }
                }
            }
            let mut entries = self.entries.write();
            for (hash, vector) in fresh {
                entries.insert(self.key(hash), vector, self.capacity);
            }
        }
        out.into_iter()
            .zip(texts)
            .map(|(v, t)| v.ok_or_else(|| Error::embedding(self.inner.id(), format!("no vector produced for text of {} bytes", t.len()))))
            .collect()
    }
}
