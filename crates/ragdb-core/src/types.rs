//! Domain types shared by the chunker, both indexes and the retriever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

pub type ChunkId = String;
pub type DocumentId = String;
pub type Meta = HashMap<String, String>;

/// A contiguous window of a document's words that is independently indexed.
///
/// - `id`: `<document_id>_chunk_<index>`
/// - `document_id`: owning document
/// - `text`: the window re-joined with single spaces
/// - `index`: zero-based ordinal among the chunks kept for the document
/// - `token_count`: words in the window, used for length statistics
///
/// The embedding is attached once after the provider has run and cannot be
/// replaced afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub text: String,
    pub index: usize,
    pub token_count: usize,
    #[serde(skip)]
    embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(document_id: &str, index: usize, text: String, token_count: usize) -> Self {
        Self {
            id: chunk_id(document_id, index),
            document_id: document_id.to_string(),
            text,
            index,
            token_count,
            embedding: None,
        }
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn attach_embedding(&mut self, embedding: Vec<f32>) -> Result<()> {
        if self.embedding.is_some() {
            return Err(Error::Operation(format!("embedding already assigned for chunk {}", self.id)));
        }
        self.embedding = Some(embedding);
        Ok(())
    }
}

pub fn chunk_id(document_id: &str, index: usize) -> ChunkId {
    format!("{document_id}_chunk_{index}")
}

/// Metadata about an ingested source. Owns its chunks through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub source: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Meta,
}

/// Listing entry returned by the document registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub source: String,
    pub file_type: Option<String>,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
    pub chunks: usize,
}

/// Indicates which engine produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by both indexes.
///
/// `score` is engine-specific (cosine confidence for vectors, raw BM25 for
/// text) but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// How a fused result was found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Vector,
    Bm25,
    Hybrid,
}

impl RetrievalMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Bm25 => "bm25",
            Self::Hybrid => "hybrid",
        }
    }
}

/// One ranked result of a retrieval call. Transient, never persisted.
///
/// `vector_score` and `lexical_score` are the raw side scores (0 when the
/// side did not return the chunk); the `normalized_*` fields are the
/// min-max rescaled values the fusion used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    pub content: String,
    pub vector_score: f32,
    pub lexical_score: f32,
    pub normalized_vector_score: f32,
    pub normalized_lexical_score: f32,
    pub hybrid_score: f32,
    pub rerank_score: Option<f32>,
    pub retrieval_method: RetrievalMethod,
}

/// User-facing reference to the passage a result came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub source: String,
    pub title: String,
    pub excerpt: String,
    pub confidence: f32,
    pub relevance: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct VectorStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub metadata_entries: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LexicalStats {
    pub total_chunks: usize,
    pub unique_terms: usize,
    pub total_postings: usize,
    pub average_chunk_length: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermStatistics {
    pub document_frequency: usize,
    pub total_frequency: usize,
}

/// Contribution of one query term to a chunk's BM25 score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermScore {
    pub term: String,
    pub term_frequency: u32,
    pub document_frequency: usize,
    pub idf: f32,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreExplanation {
    pub chunk_id: ChunkId,
    pub total_score: f32,
    pub chunk_length: usize,
    pub average_chunk_length: f32,
    pub term_scores: Vec<TermScore>,
}
