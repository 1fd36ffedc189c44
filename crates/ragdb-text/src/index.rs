use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use ragdb_core::config::LexicalConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::LexicalRepository;
use ragdb_core::types::{Chunk, ChunkId, LexicalStats, ScoreExplanation, SearchHit, SourceKind, TermStatistics};

use crate::search::{self, Bm25Params};
use crate::tantivy_utils::Analyzer;

/// Term → (chunk → term frequency) plus per-chunk lengths.
///
/// Document frequency of a term is the size of its posting map, so it always
/// equals the number of distinct chunks containing it.
#[derive(Debug, Default)]
pub(crate) struct InvertedIndex {
	pub(crate) postings: HashMap<String, HashMap<ChunkId, u32>>,
	pub(crate) chunk_lengths: HashMap<ChunkId, usize>,
	pub(crate) total_length: u64,
}

impl InvertedIndex {
	pub(crate) fn insert(&mut self, chunk_id: &str, terms: &[String]) {
		if self.chunk_lengths.contains_key(chunk_id) { self.remove(chunk_id); }
		let mut tf: HashMap<&str, u32> = HashMap::new();
		for term in terms { *tf.entry(term.as_str()).or_insert(0) += 1; }
		for (term, count) in tf {
			self.postings.entry(term.to_string()).or_default().insert(chunk_id.to_string(), count);
		}
		self.chunk_lengths.insert(chunk_id.to_string(), terms.len());
		self.total_length += terms.len() as u64;
	}

	pub(crate) fn remove(&mut self, chunk_id: &str) -> bool {
		let Some(len) = self.chunk_lengths.remove(chunk_id) else { return false };
		self.total_length -= len as u64;
		self.postings.retain(|_, chunks| { chunks.remove(chunk_id); !chunks.is_empty() });
		true
	}

	pub(crate) fn chunk_count(&self) -> usize { self.chunk_lengths.len() }

	pub(crate) fn average_length(&self) -> f32 {
		if self.chunk_lengths.is_empty() { return 0.0; }
		self.total_length as f32 / self.chunk_lengths.len() as f32
	}

	pub(crate) fn chunk_length(&self, chunk_id: &str) -> Result<usize> {
		self.chunk_lengths.get(chunk_id).copied().ok_or_else(|| {
			Error::IndexCorruption(format!("posting references chunk {chunk_id} with no recorded length"))
		})
	}
}

/// Thread-safe BM25 index. Writers take the lock once per call, so a search
/// sees either none or all of the chunks passed to one `add_chunks`.
pub struct LexicalIndex {
	inner: RwLock<InvertedIndex>,
	analyzer: Analyzer,
	params: Bm25Params,
}

impl LexicalIndex {
	pub fn new(config: &LexicalConfig) -> Self {
		Self {
			inner: RwLock::new(InvertedIndex::default()),
			analyzer: Analyzer::new(config.remove_stop_words),
			params: Bm25Params { k1: config.k1, b: config.b },
		}
	}

	pub fn add_document(&self, chunk_id: &str, text: &str) {
		let terms = self.analyzer.terms(text);
		self.inner.write().insert(chunk_id, &terms);
	}

	pub fn add_chunks(&self, chunks: &[Chunk]) {
		let analyzed: Vec<(&str, Vec<String>)> = chunks.iter().map(|c| (c.id.as_str(), self.analyzer.terms(&c.text))).collect();
		let mut inner = self.inner.write();
		for (id, terms) in &analyzed { inner.insert(id, terms); }
		debug!(added = analyzed.len(), total = inner.chunk_count(), "lexical index updated");
	}

	pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		let terms = search::distinct(self.analyzer.terms(query));
		if terms.is_empty() || k == 0 { return Ok(Vec::new()); }
		let inner = self.inner.read();
		let mut scored: Vec<(String, f32)> = search::score_all(&inner, &terms, self.params)?.into_iter().collect();
		drop(inner);
		scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
		scored.truncate(k);
		Ok(scored.into_iter().map(|(chunk_id, score)| SearchHit { chunk_id, score, source: SourceKind::Text }).collect())
	}

	/// Per-term breakdown of a chunk's score; `total_score` is the sum of the
	/// entries. Query terms missing from the corpus appear with score 0.
	pub fn explain_score(&self, query: &str, chunk_id: &str) -> Result<ScoreExplanation> {
		let terms = search::distinct(self.analyzer.terms(query));
		let inner = self.inner.read();
		if !inner.chunk_lengths.contains_key(chunk_id) {
			return Err(Error::NotFound(format!("chunk {chunk_id} in lexical index")));
		}
		search::explain(&inner, &terms, chunk_id, self.params)
	}

	pub fn term_statistics(&self, term: &str) -> TermStatistics {
		let Some(term) = self.analyzer.terms(term).into_iter().next() else { return TermStatistics::default() };
		let inner = self.inner.read();
		inner.postings.get(&term).map_or_else(TermStatistics::default, |chunks| TermStatistics {
			document_frequency: chunks.len(),
			total_frequency: chunks.values().map(|&tf| tf as usize).sum(),
		})
	}

	pub fn remove_chunks(&self, chunk_ids: &[ChunkId]) -> usize {
		let mut inner = self.inner.write();
		let mut removed = 0;
		for id in chunk_ids {
			if inner.remove(id) { removed += 1; }
		}
		removed
	}

	pub fn statistics(&self) -> LexicalStats {
		let inner = self.inner.read();
		LexicalStats {
			total_chunks: inner.chunk_count(),
			unique_terms: inner.postings.len(),
			total_postings: inner.postings.values().map(HashMap::len).sum(),
			average_chunk_length: inner.average_length(),
		}
	}

	pub fn analyzer(&self) -> &Analyzer { &self.analyzer }
}

impl Default for LexicalIndex {
	fn default() -> Self { Self::new(&LexicalConfig::default()) }
}

impl LexicalRepository for LexicalIndex {
	fn add_chunks(&self, chunks: &[Chunk]) { Self::add_chunks(self, chunks) }
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> { Self::search(self, query, k) }
	fn explain_score(&self, query: &str, chunk_id: &str) -> Result<ScoreExplanation> { Self::explain_score(self, query, chunk_id) }
	fn term_statistics(&self, term: &str) -> TermStatistics { Self::term_statistics(self, term) }
	fn analyze(&self, text: &str) -> Vec<String> { self.analyzer.terms(text) }
	fn remove_chunks(&self, chunk_ids: &[ChunkId]) -> usize { Self::remove_chunks(self, chunk_ids) }
	fn statistics(&self) -> LexicalStats { Self::statistics(self) }
}
