//! In-memory registry of documents and the chunks they own.
//!
//! Chunks live exactly as long as their document: `remove_document` drops
//! both and hands back the chunk ids so the indexes can be purged too.
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkId, Document, DocumentId, DocumentSummary};

pub const FILE_TYPE_KEY: &str = "file_type";

#[derive(Default)]
struct Inner {
    order: Vec<DocumentId>,
    documents: HashMap<DocumentId, Document>,
    chunk_ids: HashMap<DocumentId, Vec<ChunkId>>,
    chunks: HashMap<ChunkId, Chunk>,
}

#[derive(Default)]
pub struct DocumentStore {
    inner: RwLock<Inner>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document, chunks: Vec<Chunk>) -> Result<()> {
        if let Some(stray) = chunks.iter().find(|c| c.document_id != document.id) {
            return Err(Error::Operation(format!(
                "chunk {} belongs to {}, not {}",
                stray.id, stray.document_id, document.id
            )));
        }
        let mut inner = self.inner.write();
        if inner.documents.contains_key(&document.id) {
            return Err(Error::Operation(format!("document {} already exists", document.id)));
        }
        let ids: Vec<ChunkId> = chunks.iter().map(|c| c.id.clone()).collect();
        for chunk in chunks {
            inner.chunks.insert(chunk.id.clone(), chunk);
        }
        inner.order.push(document.id.clone());
        inner.chunk_ids.insert(document.id.clone(), ids);
        inner.documents.insert(document.id.clone(), document);
        Ok(())
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.inner.read().documents.get(id).cloned()
    }

    pub fn chunk(&self, id: &str) -> Option<Chunk> {
        self.inner.read().chunks.get(id).cloned()
    }

    /// Chunk together with its owning document. A chunk whose document is
    /// missing means the registry itself is broken.
    pub fn chunk_with_document(&self, id: &str) -> Result<Option<(Chunk, Document)>> {
        let inner = self.inner.read();
        let Some(chunk) = inner.chunks.get(id) else { return Ok(None) };
        let document = inner.documents.get(&chunk.document_id).ok_or_else(|| {
            Error::IndexCorruption(format!("chunk {} references missing document {}", id, chunk.document_id))
        })?;
        Ok(Some((chunk.clone(), document.clone())))
    }

    pub fn chunks_of(&self, document_id: &str) -> Vec<Chunk> {
        let inner = self.inner.read();
        inner
            .chunk_ids
            .get(document_id)
            .map(|ids| ids.iter().filter_map(|id| inner.chunks.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Chunk ids of a document, `None` if the document is unknown.
    pub fn chunk_ids_of(&self, document_id: &str) -> Option<Vec<ChunkId>> {
        let inner = self.inner.read();
        inner.documents.contains_key(document_id).then(|| inner.chunk_ids.get(document_id).cloned().unwrap_or_default())
    }

    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.documents.get(id))
            .map(|doc| DocumentSummary {
                id: doc.id.clone(),
                title: doc.title.clone(),
                source: doc.source.clone(),
                file_type: doc.metadata.get(FILE_TYPE_KEY).cloned(),
                word_count: doc.word_count,
                created_at: doc.created_at,
                chunks: inner.chunk_ids.get(&doc.id).map_or(0, Vec::len),
            })
            .collect()
    }

    /// Removes a document and all of its chunks, returning the removed chunk ids.
    pub fn remove_document(&self, id: &str) -> Result<Vec<ChunkId>> {
        let mut inner = self.inner.write();
        if inner.documents.remove(id).is_none() {
            return Err(Error::NotFound(format!("document {id}")));
        }
        inner.order.retain(|d| d != id);
        let ids = inner.chunk_ids.remove(id).unwrap_or_default();
        for chunk_id in &ids {
            inner.chunks.remove(chunk_id);
        }
        Ok(ids)
    }

    pub fn document_count(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }
}

/// Document identity derived from what was uploaded and when. `nonce`
/// separates uploads that share title, source and timestamp.
pub fn document_id(title: &str, source: &str, created_at: DateTime<Utc>, nonce: u64) -> DocumentId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\0");
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(created_at.to_rfc3339().as_bytes());
    hasher.update(&nonce.to_le_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..32].to_string()
}
