//! Hybrid retrieval: embed the query, run the dense and lexical searches
//! concurrently, fuse, filter, optionally rerank, and cite.
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use ragdb_core::config::{CitationConfig, RetrievalConfig};
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{EmbeddingProvider, LexicalRepository, VectorRepository};
use ragdb_core::types::{Citation, LexicalStats, ScoreExplanation, ScoredResult, SearchHit, VectorStats};
use ragdb_core::DocumentStore;

use crate::citation::CitationBuilder;
use crate::fusion::{by_score_then_id, fuse};
use crate::rerank::rerank_score;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalWithCitations {
    pub results: Vec<ScoredResult>,
    pub citations: Vec<Citation>,
}

/// Why a chunk scored the way it did for a query.
///
/// `result` and `rank` come from a retrieval over every indexed chunk, so
/// min-max normalisation sees the full candidate set. Scores can differ from a
/// `retrieve` call with a small `k`, whose candidate pool is `k * oversample`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalExplanation {
    pub query: String,
    pub chunk_id: String,
    pub document_id: String,
    pub query_terms: Vec<String>,
    /// Cosine confidence of the chunk against the query embedding.
    pub vector_similarity: Option<f32>,
    pub lexical: ScoreExplanation,
    /// The fused result for this chunk, if it survives fusion and filtering.
    pub result: Option<ScoredResult>,
    /// Zero-based position among all results for the query, with the
    /// configured `min_confidence` and `rerank`.
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverStats {
    pub documents: usize,
    pub chunks: usize,
    pub embedder_id: String,
    pub embedding_dim: usize,
    pub vector: VectorStats,
    pub lexical: LexicalStats,
}

pub struct HybridRetriever<L, V>
where
    L: LexicalRepository + 'static,
    V: VectorRepository + 'static,
{
    lexical: Arc<L>,
    vector: Arc<V>,
    store: Arc<DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    citations: CitationBuilder,
}

impl<L, V> HybridRetriever<L, V>
where
    L: LexicalRepository + 'static,
    V: VectorRepository + 'static,
{
    pub fn new(
        lexical: Arc<L>,
        vector: Arc<V>,
        store: Arc<DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
        citation: &CitationConfig,
    ) -> Self {
        Self { lexical, vector, store, embedder, config, citations: CitationBuilder::new(citation) }
    }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    pub async fn retrieve(&self, query: &str, k: usize, min_confidence: f32, rerank: bool) -> Result<Vec<ScoredResult>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.embed_query(query).await?;
        let candidates = k.saturating_mul(self.config.oversample.max(1));
        let (vector_hits, lexical_hits) = self.search_both(query, query_vec, candidates).await?;
        let vector_hits: Vec<SearchHit> = vector_hits.into_iter().filter(|h| h.score > 0.0).collect();
        debug!(vector = vector_hits.len(), lexical = lexical_hits.len(), "sub-search candidates");

        let fused = fuse(&vector_hits, &lexical_hits, self.config.vector_weight);
        let fused_count = fused.len();
        let query_terms = if rerank { self.lexical.analyze(query) } else { Vec::new() };
        let mut results = Vec::new();
        for f in fused.into_iter().filter(|f| f.hybrid_score >= min_confidence) {
            let Some(chunk) = self.store.chunk(&f.chunk_id) else {
                self.check_deleted(&f.chunk_id)?;
                continue;
            };
            let secondary = rerank.then(|| rerank_score(f.hybrid_score, &query_terms, &self.lexical.analyze(&chunk.text)));
            results.push(ScoredResult {
                chunk_id: f.chunk_id,
                document_id: chunk.document_id,
                content: chunk.text,
                vector_score: f.vector_score,
                lexical_score: f.lexical_score,
                normalized_vector_score: f.normalized_vector_score,
                normalized_lexical_score: f.normalized_lexical_score,
                hybrid_score: f.hybrid_score,
                rerank_score: secondary,
                retrieval_method: f.method,
            });
        }
        if rerank {
            results.sort_by(|a, b| by_score_then_id(a.rerank_score.unwrap_or(0.0), &a.chunk_id, b.rerank_score.unwrap_or(0.0), &b.chunk_id));
        }
        results.truncate(k);
        info!(query_len = query.len(), fused = fused_count, returned = results.len(), rerank, "retrieval complete");
        Ok(results)
    }

    /// Retrieves with the configured `min_confidence` and `rerank` and pairs
    /// every result with its citation, in the same order.
    pub async fn retrieve_with_citations(&self, query: &str, k: usize) -> Result<RetrievalWithCitations> {
        self.retrieve_cited(query, k, self.config.min_confidence, self.config.rerank).await
    }

    pub async fn retrieve_cited(&self, query: &str, k: usize, min_confidence: f32, rerank: bool) -> Result<RetrievalWithCitations> {
        let found = self.retrieve(query, k, min_confidence, rerank).await?;
        let mut results = Vec::with_capacity(found.len());
        let mut citations = Vec::with_capacity(found.len());
        for r in found {
            match self.store.chunk_with_document(&r.chunk_id)? {
                Some((chunk, document)) => {
                    citations.push(self.citations.build(&r, &chunk, &document));
                    results.push(r);
                }
                None => self.check_deleted(&r.chunk_id)?,
            }
        }
        Ok(RetrievalWithCitations { results, citations })
    }

    /// Lexical breakdown, vector similarity and fused position of one chunk.
    /// The fused position is taken over all indexed chunks (see
    /// [`RetrievalExplanation`]).
    pub async fn explain_retrieval(&self, query: &str, chunk_id: &str) -> Result<RetrievalExplanation> {
        let chunk = self.store.chunk(chunk_id).ok_or_else(|| Error::NotFound(format!("chunk {chunk_id}")))?;
        let lexical = self.lexical.explain_score(query, chunk_id)?;
        let vector_similarity = if query.trim().is_empty() {
            None
        } else {
            let query_vec = self.embed_query(query).await?;
            self.vector.similarity(chunk_id, &query_vec)?
        };
        let all = self.store.chunk_count().max(1);
        let results = self.retrieve(query, all, self.config.min_confidence, self.config.rerank).await?;
        let rank = results.iter().position(|r| r.chunk_id == chunk_id);
        let result = rank.and_then(|i| results.get(i).cloned());
        Ok(RetrievalExplanation {
            query: query.to_string(),
            chunk_id: chunk_id.to_string(),
            document_id: chunk.document_id,
            query_terms: self.lexical.analyze(query),
            vector_similarity,
            lexical,
            result,
            rank,
        })
    }

    pub fn statistics(&self) -> RetrieverStats {
        RetrieverStats {
            documents: self.store.document_count(),
            chunks: self.store.chunk_count(),
            embedder_id: self.embedder.id().to_string(),
            embedding_dim: self.embedder.dim(),
            vector: self.vector.statistics(),
            lexical: self.lexical.statistics(),
        }
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let provider = self.embedder.id().to_string();
        let mut vectors = self.embedder.embed(&[query.to_string()]).await.map_err(|e| match e {
            e @ (Error::Embedding { .. } | Error::DimensionMismatch { .. }) => e,
            other => Error::embedding(provider.clone(), other.to_string()),
        })?;
        if vectors.len() != 1 {
            return Err(Error::embedding(provider, format!("expected 1 query vector, got {}", vectors.len())));
        }
        Ok(vectors.remove(0))
    }

    /// A chunk missing from the store was either deleted while the query ran
    /// (deletes clear the indexes before the store) or the indexes are out of
    /// sync with the store.
    fn check_deleted(&self, chunk_id: &str) -> Result<()> {
        if self.vector.contains(chunk_id) {
            return Err(Error::IndexCorruption(format!("index returned chunk {chunk_id} which is not in the document store")));
        }
        debug!(chunk_id, "skipping chunk deleted during retrieval");
        Ok(())
    }

    /// Runs both searches on the blocking pool and waits for both; if either
    /// fails the call fails with the failing stage named.
    ///
    /// Blocking tasks cannot be aborted: if the returned future is dropped,
    /// the searches still run to completion under their read locks and their
    /// hits are discarded.
    async fn search_both(&self, query: &str, query_vec: Vec<f32>, k: usize) -> Result<(Vec<SearchHit>, Vec<SearchHit>)> {
        let vector = Arc::clone(&self.vector);
        let lexical = Arc::clone(&self.lexical);
        let query = query.to_string();
        let vector_task = async move {
            tokio::task::spawn_blocking(move || vector.search(&query_vec, k))
                .await
                .map_err(|e| Error::Operation(format!("search task failed: {e}")).in_stage("vector"))?
                .map_err(|e| e.in_stage("vector"))
        };
        let lexical_task = async move {
            tokio::task::spawn_blocking(move || lexical.search(&query, k))
                .await
                .map_err(|e| Error::Operation(format!("search task failed: {e}")).in_stage("bm25"))?
                .map_err(|e| e.in_stage("bm25"))
        };
        futures::future::try_join(vector_task, lexical_task).await
    }
}
