use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::VectorRepository;
use ragdb_core::types::{Chunk, ChunkId, SearchHit, SourceKind, VectorStats};

struct VectorRecord {
	chunk_id: ChunkId,
	vector: Vec<f32>,
	norm: f32,
}

#[derive(Default)]
struct Inner {
	records: Vec<VectorRecord>,
	positions: HashMap<ChunkId, usize>,
}

/// Exact brute-force cosine index with a fixed dimension.
///
/// Records keep insertion order, which is also the tie-break order for equal
/// similarities. Writes validate the whole batch before taking the lock, so a
/// rejected batch leaves the index untouched.
pub struct VectorIndex {
	dim: usize,
	inner: RwLock<Inner>,
}

impl VectorIndex {
	pub fn new(dim: usize) -> Result<Self> {
		if dim == 0 { return Err(Error::InvalidConfig("vector dimension must be positive".into())); }
		Ok(Self { dim, inner: RwLock::new(Inner::default()) })
	}

	pub fn dim(&self) -> usize { self.dim }

	pub fn add(&self, chunks: &[Chunk]) -> Result<()> {
		let mut batch = Vec::with_capacity(chunks.len());
		for chunk in chunks {
			let vector = chunk.embedding().ok_or_else(|| Error::Operation(format!("chunk {} has no embedding", chunk.id)))?;
			self.check_dim(vector.len(), &chunk.id)?;
			batch.push(VectorRecord { chunk_id: chunk.id.clone(), vector: vector.to_vec(), norm: l2_norm(vector) });
		}
		let mut inner = self.inner.write();
		for record in batch {
			let existing = inner.positions.get(&record.chunk_id).copied();
			match existing {
				Some(pos) => inner.records[pos] = record,
				None => {
					let pos = inner.records.len();
					inner.positions.insert(record.chunk_id.clone(), pos);
					inner.records.push(record);
				}
			}
		}
		debug!(added = chunks.len(), total = inner.records.len(), "vector index updated");
		Ok(())
	}

	/// Top `k` chunks by confidence `max(0, cosine)`, descending.
	pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		self.check_dim(query.len(), "query")?;
		if k == 0 { return Ok(Vec::new()); }
		let q_norm = l2_norm(query);
		let inner = self.inner.read();
		let mut scored: Vec<(&VectorRecord, f32)> = inner.records.iter().map(|r| (r, confidence(query, q_norm, r))).collect();
		// stable: equal scores keep insertion order
		scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
		scored.truncate(k);
		Ok(scored.into_iter().map(|(r, score)| SearchHit { chunk_id: r.chunk_id.clone(), score, source: SourceKind::Vector }).collect())
	}

	pub fn similarity(&self, chunk_id: &str, query: &[f32]) -> Result<Option<f32>> {
		self.check_dim(query.len(), "query")?;
		let inner = self.inner.read();
		let Some(&pos) = inner.positions.get(chunk_id) else { return Ok(None) };
		let record = inner.records.get(pos).ok_or_else(|| Error::IndexCorruption(format!("vector position {pos} for {chunk_id} out of range")))?;
		Ok(Some(confidence(query, l2_norm(query), record)))
	}

	pub fn remove_chunks(&self, chunk_ids: &[ChunkId]) -> usize {
		let mut inner = self.inner.write();
		let before = inner.records.len();
		inner.records.retain(|r| !chunk_ids.contains(&r.chunk_id));
		let removed = before - inner.records.len();
		if removed > 0 {
			let positions = inner.records.iter().enumerate().map(|(i, r)| (r.chunk_id.clone(), i)).collect();
			inner.positions = positions;
		}
		removed
	}

	pub fn contains(&self, chunk_id: &str) -> bool { self.inner.read().positions.contains_key(chunk_id) }

	pub fn statistics(&self) -> VectorStats {
		let inner = self.inner.read();
		VectorStats { total_vectors: inner.records.len(), dimension: self.dim, metadata_entries: inner.positions.len() }
	}

	fn check_dim(&self, actual: usize, context: &str) -> Result<()> {
		if actual != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual, context: context.to_string() });
		}
		Ok(())
	}
}

fn l2_norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

fn confidence(query: &[f32], q_norm: f32, record: &VectorRecord) -> f32 {
	if q_norm == 0.0 || record.norm == 0.0 { return 0.0; }
	let dot: f32 = query.iter().zip(&record.vector).map(|(a, b)| a * b).sum();
	(dot / (q_norm * record.norm)).clamp(0.0, 1.0)
}

impl VectorRepository for VectorIndex {
	fn add(&self, chunks: &[Chunk]) -> Result<()> { Self::add(self, chunks) }
	fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> { Self::search(self, query_embedding, k) }
	fn similarity(&self, chunk_id: &str, query_embedding: &[f32]) -> Result<Option<f32>> { Self::similarity(self, chunk_id, query_embedding) }
	fn contains(&self, chunk_id: &str) -> bool { Self::contains(self, chunk_id) }
	fn remove_chunks(&self, chunk_ids: &[ChunkId]) -> usize { Self::remove_chunks(self, chunk_ids) }
	fn statistics(&self) -> VectorStats { Self::statistics(self) }
}
