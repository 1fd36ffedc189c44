//! Word-window chunking with overlap.
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::Chunk;

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Fails fast on a window that could never advance (`overlap >= chunk_size`).
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Splits `text` on whitespace and emits windows of `chunk_size` words,
    /// advancing `chunk_size - overlap` words per step. Windows whose joined
    /// text is not longer than `min_chunk_chars` are dropped; kept windows are
    /// numbered consecutively.
    pub fn chunk(&self, text: &str, document_id: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = self.config.chunk_size - self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.config.chunk_size).min(words.len());
            let window = &words[start..end];
            let joined = window.join(" ");
            if joined.chars().count() > self.config.min_chunk_chars {
                chunks.push(Chunk::new(document_id, chunks.len(), joined, window.len()));
            }
            start += step;
        }
        chunks
    }
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
