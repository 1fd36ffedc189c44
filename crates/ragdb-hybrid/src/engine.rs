//! `RagEngine` wires the chunker, both indexes, the document store and the
//! embedding provider into the operations exposed to API layers.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use ragdb_core::chunker::word_count;
use ragdb_core::config::RagSettings;
use ragdb_core::error::{Error, Result};
use ragdb_core::store::document_id;
use ragdb_core::traits::EmbeddingProvider;
use ragdb_core::types::{Document, DocumentId, DocumentSummary, Meta, ScoredResult};
use ragdb_core::{Chunker, DocumentStore};
use ragdb_embed::get_default_embedder;
use ragdb_text::LexicalIndex;
use ragdb_vector::{CachedEmbeddingProvider, VectorIndex};

use crate::retriever::{HybridRetriever, RetrievalExplanation, RetrievalWithCitations, RetrieverStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub document_id: DocumentId,
    pub chunks_created: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub document_id: DocumentId,
    pub chunks_removed: usize,
}

pub type EngineStats = RetrieverStats;

pub struct RagEngine {
    settings: RagSettings,
    chunker: Chunker,
    store: Arc<DocumentStore>,
    lexical: Arc<LexicalIndex>,
    vector: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: HybridRetriever<LexicalIndex, VectorIndex>,
    // uploads and deletes are applied one at a time
    writer: Mutex<()>,
    uploads: AtomicU64,
}

impl RagEngine {
    /// Builds an engine with the provider selected by `settings.embedding`.
    pub fn from_settings(settings: RagSettings) -> Result<Self> {
        let provider = get_default_embedder(&settings.embedding)?;
        Self::with_provider(settings, provider)
    }

    pub fn with_provider(settings: RagSettings, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        settings.validate()?;
        let chunker = Chunker::new(settings.chunking.clone())?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            CachedEmbeddingProvider::new(provider, settings.embedding.batch_size).with_capacity(settings.embedding.cache_capacity),
        );
        let store = Arc::new(DocumentStore::new());
        let lexical = Arc::new(LexicalIndex::new(&settings.lexical));
        let vector = Arc::new(VectorIndex::new(embedder.dim())?);
        let retriever = HybridRetriever::new(
            Arc::clone(&lexical),
            Arc::clone(&vector),
            Arc::clone(&store),
            Arc::clone(&embedder),
            settings.retrieval.clone(),
            &settings.citation,
        );
        info!(embedder = embedder.id(), dim = embedder.dim(), "rag engine ready");
        Ok(Self { settings, chunker, store, lexical, vector, embedder, retriever, writer: Mutex::new(()), uploads: AtomicU64::new(0) })
    }

    pub fn settings(&self) -> &RagSettings { &self.settings }

    /// Chunks, embeds and indexes a document. Either every index receives the
    /// document's chunks or none does.
    pub async fn upload(&self, text: &str, title: &str, source: &str, metadata: Meta) -> Result<UploadReceipt> {
        let _guard = self.writer.lock().await;
        let created_at = Utc::now();
        let id = document_id(title, source, created_at, self.uploads.fetch_add(1, Ordering::Relaxed));
        let mut chunks = self.chunker.chunk(text, &id);
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(format!("{title} ({source})")));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.attach_embedding(vector)?;
        }

        let words = word_count(text);
        let document = Document { id: id.clone(), title: title.to_string(), source: source.to_string(), word_count: words, created_at, metadata };
        self.store.insert(document, chunks.clone())?;
        if let Err(e) = self.vector.add(&chunks) {
            if let Err(rollback) = self.store.remove_document(&id) {
                warn!(document_id = %id, error = %rollback, "rollback after failed vector insert");
            }
            return Err(e);
        }
        self.lexical.add_chunks(&chunks);
        info!(document_id = %id, chunks = chunks.len(), words, "document uploaded");
        Ok(UploadReceipt { document_id: id, chunks_created: chunks.len(), word_count: words })
    }

    /// Removes a document and all of its chunks from both indexes and then
    /// from the store, so a concurrent search never gets back an indexed
    /// chunk the store has already dropped.
    pub async fn delete_document(&self, id: &str) -> Result<DeleteReceipt> {
        let _guard = self.writer.lock().await;
        let chunk_ids = self.store.chunk_ids_of(id).ok_or_else(|| Error::NotFound(format!("document {id}")))?;
        let vectors = self.vector.remove_chunks(&chunk_ids);
        let postings = self.lexical.remove_chunks(&chunk_ids);
        self.store.remove_document(id)?;
        if vectors != chunk_ids.len() || postings != chunk_ids.len() {
            warn!(document_id = %id, chunks = chunk_ids.len(), vectors, postings, "index removal counts differ from store");
        }
        info!(document_id = %id, chunks = chunk_ids.len(), "document deleted");
        Ok(DeleteReceipt { document_id: id.to_string(), chunks_removed: chunk_ids.len() })
    }

    pub async fn search(&self, query: &str, k: usize, min_confidence: f32, rerank: bool) -> Result<Vec<ScoredResult>> {
        self.retriever.retrieve(query, k, min_confidence, rerank).await
    }

    pub async fn search_with_citations(&self, query: &str, k: usize) -> Result<RetrievalWithCitations> {
        self.retriever.retrieve_with_citations(query, k).await
    }

    /// `search_with_citations` with explicit `min_confidence` and `rerank`.
    pub async fn search_cited(&self, query: &str, k: usize, min_confidence: f32, rerank: bool) -> Result<RetrievalWithCitations> {
        self.retriever.retrieve_cited(query, k, min_confidence, rerank).await
    }

    pub async fn explain(&self, query: &str, chunk_id: &str) -> Result<RetrievalExplanation> {
        self.retriever.explain_retrieval(query, chunk_id).await
    }

    pub fn stats(&self) -> EngineStats { self.retriever.statistics() }

    pub fn list_documents(&self) -> Vec<DocumentSummary> { self.store.list_documents() }

    pub fn document(&self, id: &str) -> Option<Document> { self.store.document(id) }
}
