use std::collections::HashSet;

const HYBRID_WEIGHT: f32 = 0.7;
const COVERAGE_WEIGHT: f32 = 0.3;
const PHRASE_BONUS: f32 = 0.1;

/// Secondary score from term overlap:
/// `clamp(0.7 * hybrid + 0.3 * coverage + phrase_bonus)` where `coverage`
/// is the share of distinct query terms found in the chunk and the bonus
/// applies when a multi-term query occurs as a contiguous run of chunk terms.
/// Both term lists must come from the same analyzer.
pub fn rerank_score(hybrid: f32, query_terms: &[String], chunk_terms: &[String]) -> f32 {
    let distinct: HashSet<&str> = query_terms.iter().map(String::as_str).collect();
    if distinct.is_empty() {
        return (HYBRID_WEIGHT * hybrid).clamp(0.0, 1.0);
    }
    let present: HashSet<&str> = chunk_terms.iter().map(String::as_str).collect();
    let covered = distinct.iter().filter(|t| present.contains(*t)).count();
    let coverage = covered as f32 / distinct.len() as f32;
    let bonus = if contains_phrase(chunk_terms, query_terms) { PHRASE_BONUS } else { 0.0 };
    (HYBRID_WEIGHT * hybrid + COVERAGE_WEIGHT * coverage + bonus).clamp(0.0, 1.0)
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    phrase.len() >= 2 && haystack.windows(phrase.len()).any(|w| w == phrase)
}
