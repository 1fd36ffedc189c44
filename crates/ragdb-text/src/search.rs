//! BM25 Okapi scoring over the inverted index.
//!
//! `score = Σ idf(t) · tf·(k1+1) / (tf + k1·(1 − b + b·|c|/avg))` with
//! `idf(t) = ln(1 + (N − df + 0.5) / (df + 0.5))`.
use std::collections::{HashMap, HashSet};

use ragdb_core::error::Result;
use ragdb_core::types::{ScoreExplanation, TermScore};

use crate::index::InvertedIndex;

#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
	pub k1: f32,
	pub b: f32,
}

/// Query terms with duplicates dropped, first occurrence order kept.
pub(crate) fn distinct(terms: Vec<String>) -> Vec<String> {
	let mut seen = HashSet::new();
	terms.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

pub fn idf(total_chunks: usize, document_frequency: usize) -> f32 {
	let n = total_chunks as f32;
	let df = document_frequency as f32;
	(1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

pub fn term_score(idf: f32, tf: u32, chunk_length: usize, average_length: f32, params: Bm25Params) -> f32 {
	if tf == 0 { return 0.0; }
	let tf = tf as f32;
	let relative_length = if average_length > 0.0 { chunk_length as f32 / average_length } else { 1.0 };
	let norm = params.k1 * (1.0 - params.b + params.b * relative_length);
	idf * (tf * (params.k1 + 1.0)) / (tf + norm)
}

/// Scores every chunk that contains at least one of `terms`.
pub(crate) fn score_all(index: &InvertedIndex, terms: &[String], params: Bm25Params) -> Result<HashMap<String, f32>> {
	let n = index.chunk_count();
	let avg = index.average_length();
	let mut scores: HashMap<String, f32> = HashMap::new();
	for term in terms {
		let Some(chunks) = index.postings.get(term) else { continue };
		let idf = idf(n, chunks.len());
		for (chunk_id, &tf) in chunks {
			let len = index.chunk_length(chunk_id)?;
			*scores.entry(chunk_id.clone()).or_insert(0.0) += term_score(idf, tf, len, avg, params);
		}
	}
	Ok(scores)
}

pub(crate) fn explain(index: &InvertedIndex, terms: &[String], chunk_id: &str, params: Bm25Params) -> Result<ScoreExplanation> {
	let n = index.chunk_count();
	let avg = index.average_length();
	let len = index.chunk_length(chunk_id)?;
	let term_scores: Vec<TermScore> = terms
		.iter()
		.map(|term| {
			let (df, tf) = index
				.postings
				.get(term)
				.map_or((0, 0), |chunks| (chunks.len(), chunks.get(chunk_id).copied().unwrap_or(0)));
			let idf = if df == 0 { 0.0 } else { idf(n, df) };
			TermScore { term: term.clone(), term_frequency: tf, document_frequency: df, idf, score: term_score(idf, tf, len, avg, params) }
		})
		.collect();
	Ok(ScoreExplanation {
		chunk_id: chunk_id.to_string(),
		total_score: term_scores.iter().map(|t| t.score).sum(),
		chunk_length: len,
		average_chunk_length: avg,
		term_scores,
	})
}
