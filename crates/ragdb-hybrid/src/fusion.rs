use std::cmp::Ordering;
use std::collections::BTreeMap;

use ragdb_core::types::{ChunkId, RetrievalMethod, SearchHit};

/// A chunk after both sides have been normalized and merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Fused {
    pub chunk_id: ChunkId,
    pub vector_score: f32,
    pub lexical_score: f32,
    pub normalized_vector_score: f32,
    pub normalized_lexical_score: f32,
    pub hybrid_score: f32,
    pub method: RetrievalMethod,
}

/// Min-max rescaling to [0, 1]. When every score is equal (including a
/// single score) each one maps to 1.0.
pub fn min_max(scores: &[f32]) -> Vec<f32> {
    let Some(min) = scores.iter().copied().reduce(f32::min) else { return Vec::new() };
    let max = scores.iter().copied().fold(min, f32::max);
    let range = max - min;
    if range <= f32::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| ((s - min) / range).clamp(0.0, 1.0)).collect()
}

#[derive(Default)]
struct Sides {
    vector: Option<(f32, f32)>,
    lexical: Option<(f32, f32)>,
}

/// Merges the two candidate lists. Chunks found by both sides get
/// `w * nv + (1 - w) * nl`; chunks found by one side keep that side's
/// normalized score. Output is sorted by hybrid score, then chunk id.
pub fn fuse(vector: &[SearchHit], lexical: &[SearchHit], vector_weight: f32) -> Vec<Fused> {
    let mut merged: BTreeMap<&str, Sides> = BTreeMap::new();
    let nv = min_max(&vector.iter().map(|h| h.score).collect::<Vec<_>>());
    for (hit, n) in vector.iter().zip(nv) {
        merged.entry(hit.chunk_id.as_str()).or_default().vector = Some((hit.score, n));
    }
    let nl = min_max(&lexical.iter().map(|h| h.score).collect::<Vec<_>>());
    for (hit, n) in lexical.iter().zip(nl) {
        merged.entry(hit.chunk_id.as_str()).or_default().lexical = Some((hit.score, n));
    }

    let mut fused: Vec<Fused> = merged
        .into_iter()
        .filter_map(|(chunk_id, sides)| {
            let (hybrid, method) = match (sides.vector, sides.lexical) {
                (Some((_, v)), Some((_, l))) => (vector_weight * v + (1.0 - vector_weight) * l, RetrievalMethod::Hybrid),
                (Some((_, v)), None) => (v, RetrievalMethod::Vector),
                (None, Some((_, l))) => (l, RetrievalMethod::Bm25),
                (None, None) => return None,
            };
            let (vector_score, normalized_vector_score) = sides.vector.unwrap_or((0.0, 0.0));
            let (lexical_score, normalized_lexical_score) = sides.lexical.unwrap_or((0.0, 0.0));
            Some(Fused {
                chunk_id: chunk_id.to_string(),
                vector_score,
                lexical_score,
                normalized_vector_score,
                normalized_lexical_score,
                hybrid_score: hybrid.clamp(0.0, 1.0),
                method,
            })
        })
        .collect();
    fused.sort_by(|a, b| by_score_then_id(a.hybrid_score, &a.chunk_id, b.hybrid_score, &b.chunk_id));
    fused
}

pub(crate) fn by_score_then_id(a_score: f32, a_id: &str, b_score: f32, b_id: &str) -> Ordering {
    b_score.partial_cmp(&a_score).unwrap_or(Ordering::Equal).then_with(|| a_id.cmp(b_id))
}
