use ragdb_core::config::CitationConfig;
use ragdb_core::types::{Chunk, Citation, Document, RetrievalMethod, ScoredResult};

/// Builds user-facing citations. Pure: the same result, chunk and document
/// always produce the same citation.
#[derive(Debug, Clone)]
pub struct CitationBuilder {
    excerpt_chars: usize,
}

impl CitationBuilder {
    pub fn new(config: &CitationConfig) -> Self {
        Self { excerpt_chars: config.excerpt_chars }
    }

    pub fn build(&self, result: &ScoredResult, chunk: &Chunk, document: &Document) -> Citation {
        Citation {
            id: chunk.id.clone(),
            document_id: document.id.clone(),
            source: document.source.clone(),
            title: document.title.clone(),
            excerpt: excerpt(&chunk.text, self.excerpt_chars),
            confidence: result.rerank_score.unwrap_or(result.hybrid_score).clamp(0.0, 1.0),
            relevance: relevance(result).clamp(0.0, 1.0),
        }
    }
}

impl Default for CitationBuilder {
    fn default() -> Self {
        Self::new(&CitationConfig::default())
    }
}

fn relevance(result: &ScoredResult) -> f32 {
    match result.retrieval_method {
        RetrievalMethod::Vector => result.normalized_vector_score,
        RetrievalMethod::Bm25 => result.normalized_lexical_score,
        RetrievalMethod::Hybrid => result.normalized_vector_score.max(result.normalized_lexical_score),
    }
}

/// First `max_chars` characters, with "..." appended when text was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_end, _)) => format!("{}...", &text[..byte_end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(method: RetrievalMethod, nv: f32, nl: f32, hybrid: f32, rerank: Option<f32>) -> ScoredResult {
        ScoredResult {
            chunk_id: "d_chunk_0".into(),
            document_id: "d".into(),
            content: String::new(),
            vector_score: 0.0,
            lexical_score: 0.0,
            normalized_vector_score: nv,
            normalized_lexical_score: nl,
            hybrid_score: hybrid,
            rerank_score: rerank,
            retrieval_method: method,
        }
    }

    #[test]
    fn excerpt_is_char_safe() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("exactly", 7), "exactly");
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn confidence_prefers_rerank_and_relevance_follows_method() {
        let chunk = Chunk::new("d", 0, "x".repeat(300), 1);
        let document = Document {
            id: "d".into(),
            title: "Title".into(),
            source: "notes/a.txt".into(),
            word_count: 1,
            created_at: Utc::now(),
            metadata: Default::default(),
        };
        let builder = CitationBuilder::default();

        let c = builder.build(&result(RetrievalMethod::Hybrid, 0.4, 0.9, 0.65, Some(1.2)), &chunk, &document);
        assert_eq!(c.confidence, 1.0);
        assert!((c.relevance - 0.9).abs() < 1e-6);
        assert_eq!(c.excerpt.chars().count(), 203);
        assert!(c.excerpt.ends_with("..."));
        assert_eq!(c.title, "Title");
        assert_eq!(c.source, "notes/a.txt");

        let c = builder.build(&result(RetrievalMethod::Bm25, 0.0, 0.3, 0.3, None), &chunk, &document);
        assert!((c.confidence - 0.3).abs() < 1e-6);
        assert!((c.relevance - 0.3).abs() < 1e-6);
    }
}
