use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, ChunkId, LexicalStats, ScoreExplanation, SearchHit, TermStatistics, VectorStats};

/// Turns texts into dense vectors. Implementations may call a local model or
/// a remote API; every vector a provider returns has length `dim()`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Dense side of the hybrid retriever.
pub trait VectorRepository: Send + Sync {
    /// All-or-nothing: either every chunk is stored or none is.
    fn add(&self, chunks: &[Chunk]) -> Result<()>;
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchHit>>;
    /// Confidence of a single stored chunk against the query, if present.
    fn similarity(&self, chunk_id: &str, query_embedding: &[f32]) -> Result<Option<f32>>;
    fn contains(&self, chunk_id: &str) -> bool;
    fn remove_chunks(&self, chunk_ids: &[ChunkId]) -> usize;
    fn statistics(&self) -> VectorStats;
}

/// Sparse side of the hybrid retriever.
pub trait LexicalRepository: Send + Sync {
    fn add_chunks(&self, chunks: &[Chunk]);
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
    fn explain_score(&self, query: &str, chunk_id: &str) -> Result<ScoreExplanation>;
    fn term_statistics(&self, term: &str) -> TermStatistics;
    /// Analyzes text exactly the way indexed chunks are analyzed.
    fn analyze(&self, text: &str) -> Vec<String>;
    fn remove_chunks(&self, chunk_ids: &[ChunkId]) -> usize;
    fn statistics(&self) -> LexicalStats;
}
