use ragdb_core::config::LexicalConfig;
use ragdb_core::types::{Chunk, SourceKind};
use ragdb_core::Error;
use ragdb_text::search::idf;
use ragdb_text::LexicalIndex;

fn chunk(id: usize, text: &str) -> Chunk {
    Chunk::new("doc", id, text.to_string(), text.split_whitespace().count())
}

fn corpus() -> LexicalIndex {
    let index = LexicalIndex::default();
    index.add_chunks(&[
        chunk(0, "Artificial intelligence is transforming healthcare with diagnosis tools"),
        chunk(1, "Machine learning models improve medical imaging and diagnosis"),
        chunk(2, "The history of Roman architecture and aqueducts"),
        chunk(3, "Artificial turf is common in modern stadiums"),
    ]);
    index
}

#[test]
fn search_ranks_matching_chunks_and_ignores_others() {
    let index = corpus();
    let hits = index.search("artificial intelligence", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk_id, "doc_chunk_0");
    assert_eq!(hits[1].chunk_id, "doc_chunk_3");
    assert!(hits[0].score > hits[1].score);
    assert!(hits.iter().all(|h| h.source == SourceKind::Text && h.score > 0.0));
}

#[test]
fn empty_or_unknown_queries_return_nothing() {
    let index = corpus();
    assert!(index.search("", 5).unwrap().is_empty());
    assert!(index.search("?!", 5).unwrap().is_empty());
    assert!(index.search("quantum", 5).unwrap().is_empty());
    assert!(index.search("diagnosis", 0).unwrap().is_empty());
    assert!(LexicalIndex::default().search("diagnosis", 5).unwrap().is_empty());
}

#[test]
fn more_occurrences_score_higher() {
    let index = LexicalIndex::default();
    index.add_chunks(&[
        chunk(0, "rust compiler borrow checker lifetime"),
        chunk(1, "rust rust compiler borrow checker"),
        chunk(2, "python interpreter garbage collector"),
    ]);
    let hits = index.search("rust", 10).unwrap();
    assert_eq!(hits[0].chunk_id, "doc_chunk_1");
    assert_eq!(hits[1].chunk_id, "doc_chunk_0");
}

#[test]
fn rarer_terms_contribute_more() {
    let index = LexicalIndex::default();
    index.add_chunks(&[
        chunk(0, "common rare"),
        chunk(1, "common filler"),
        chunk(2, "common filler"),
    ]);
    let explanation = index.explain_score("common rare", "doc_chunk_0").unwrap();
    let common = &explanation.term_scores[0];
    let rare = &explanation.term_scores[1];
    assert_eq!(common.document_frequency, 3);
    assert_eq!(rare.document_frequency, 1);
    assert!(rare.idf > common.idf);
    assert!(rare.score > common.score);
    assert!((rare.idf - idf(3, 1)).abs() < 1e-6);
}

#[test]
fn explanation_sums_to_total_and_includes_absent_terms() {
    let index = corpus();
    let explanation = index.explain_score("artificial intelligence quantum", "doc_chunk_0").unwrap();
    assert_eq!(explanation.chunk_id, "doc_chunk_0");
    let terms: Vec<&str> = explanation.term_scores.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(terms, vec!["artificial", "intelligence", "quantum"]);

    let sum: f32 = explanation.term_scores.iter().map(|t| t.score).sum();
    assert!((sum - explanation.total_score).abs() < 1e-5);
    let quantum = &explanation.term_scores[2];
    assert_eq!(quantum.term_frequency, 0);
    assert_eq!(quantum.score, 0.0);

    let hit = index.search("artificial intelligence quantum", 1).unwrap().remove(0);
    assert_eq!(hit.chunk_id, "doc_chunk_0");
    assert!((hit.score - explanation.total_score).abs() < 1e-5);
    assert_eq!(explanation.chunk_length, 8);
}

#[test]
fn explaining_an_unknown_chunk_is_not_found() {
    let index = corpus();
    assert!(matches!(index.explain_score("diagnosis", "missing"), Err(Error::NotFound(_))));
}

#[test]
fn equal_scores_are_ordered_by_chunk_id() {
    let index = LexicalIndex::default();
    index.add_chunks(&[chunk(2, "same words here"), chunk(0, "same words here"), chunk(1, "same words here")]);
    let ids: Vec<String> = index.search("words", 10).unwrap().into_iter().map(|h| h.chunk_id).collect();
    assert_eq!(ids, vec!["doc_chunk_0", "doc_chunk_1", "doc_chunk_2"]);
}

#[test]
fn term_statistics_track_document_and_total_frequency() {
    let index = LexicalIndex::default();
    index.add_chunks(&[chunk(0, "data data science"), chunk(1, "data engineering")]);
    let stats = index.term_statistics("Data");
    assert_eq!(stats.document_frequency, 2);
    assert_eq!(stats.total_frequency, 3);
    assert_eq!(index.term_statistics("missing").document_frequency, 0);
}

#[test]
fn removing_chunks_updates_statistics() {
    let index = LexicalIndex::default();
    index.add_chunks(&[chunk(0, "alpha beta"), chunk(1, "alpha gamma delta epsilon")]);
    let before = index.statistics();
    assert_eq!(before.total_chunks, 2);
    assert_eq!(before.unique_terms, 5);
    assert!((before.average_chunk_length - 3.0).abs() < 1e-6);

    assert_eq!(index.remove_chunks(&["doc_chunk_1".to_string(), "nope".to_string()]), 1);
    let after = index.statistics();
    assert_eq!(after.total_chunks, 1);
    assert_eq!(after.unique_terms, 2);
    assert_eq!(after.total_postings, 2);
    assert!((after.average_chunk_length - 2.0).abs() < 1e-6);
    assert_eq!(index.term_statistics("alpha").document_frequency, 1);
    assert!(index.search("gamma", 5).unwrap().is_empty());
}

#[test]
fn stop_word_removal_is_configurable() {
    let index = LexicalIndex::new(&LexicalConfig { remove_stop_words: true, ..LexicalConfig::default() });
    index.add_chunks(&[chunk(0, "the quick fox")]);
    assert!(index.search("the", 5).unwrap().is_empty());
    assert_eq!(index.search("the fox", 5).unwrap().len(), 1);
}
