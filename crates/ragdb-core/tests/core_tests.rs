use std::fs;
use std::io::Write;
use tempfile::TempDir;

use ragdb_core::config::ChunkingConfig;
use ragdb_core::data_processor::{file_type_label, DataProcessor};
use ragdb_core::{Chunker, Error};

fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
}

fn chunker(chunk_size: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkingConfig { chunk_size, overlap, min_chunk_chars: 50 }).expect("valid config")
}

#[test]
fn overlap_not_smaller_than_chunk_size_is_rejected() {
    let err = Chunker::new(ChunkingConfig { chunk_size: 10, overlap: 10, min_chunk_chars: 50 }).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    let err = Chunker::new(ChunkingConfig { chunk_size: 0, overlap: 0, min_chunk_chars: 50 }).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(chunker(100, 20).chunk("", "doc").is_empty());
    assert!(chunker(100, 20).chunk("   \n\t ", "doc").is_empty());
}

#[test]
fn windows_advance_by_size_minus_overlap() {
    let text = words(250);
    let chunks = chunker(100, 20).chunk(&text, "doc");
    // starts at 0, 80, 160, 240
    assert_eq!(chunks.len(), 4);
    assert!(chunks[1].text.starts_with("word80 "));
    assert!(chunks[2].text.starts_with("word160 "));
    assert_eq!(chunks[0].token_count, 100);
    assert_eq!(chunks[3].token_count, 10);
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.index, i);
        assert_eq!(c.id, format!("doc_chunk_{i}"));
        assert_eq!(c.document_id, "doc");
        assert!(c.embedding().is_none());
    }
}

#[test]
fn every_word_is_covered_in_order() {
    let text = words(537);
    let original: Vec<&str> = text.split_whitespace().collect();
    let chunks = chunker(60, 15).chunk(&text, "doc");
    let step = 60 - 15;
    let mut rebuilt: Vec<String> = Vec::new();
    for c in &chunks {
        let start = c.index * step;
        let w: Vec<&str> = c.text.split_whitespace().collect();
        assert_eq!(w[..], original[start..start + w.len()]);
        // take only the non-overlapping prefix except for the last window
        let fresh = if c.index + 1 == chunks.len() { w.len() } else { step.min(w.len()) };
        rebuilt.extend(w[..fresh].iter().map(|s| s.to_string()));
    }
    assert_eq!(rebuilt, original);
}

#[test]
fn short_trailing_fragment_is_discarded() {
    // 120 long words then the window starting at 100 holds 20 short words
    let mut text = words(100);
    text.push_str(&" x".repeat(20));
    let chunks = chunker(100, 0).chunk(&text, "doc");
    assert_eq!(chunks.len(), 1);
    for c in &chunks { assert!(c.text.chars().count() > 50); }
}

#[test]
fn attached_embedding_cannot_be_replaced() {
    let mut c = chunker(100, 10).chunk(&words(30), "doc").remove(0);
    c.attach_embedding(vec![1.0, 0.0]).expect("first attach");
    assert!(matches!(c.attach_embedding(vec![0.0, 1.0]), Err(Error::Operation(_))));
    assert_eq!(c.embedding(), Some(&[1.0, 0.0][..]));
}

#[test]
fn process_directory_reads_text_files_only() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("a.txt")).unwrap();
    writeln!(f, "Short text").unwrap();
    fs::create_dir(dir.join("notes")).unwrap();
    fs::write(dir.join("notes/b.md"), "# heading\nbody").unwrap();
    fs::write(dir.join("c.pdf"), [0u8, 159, 146, 150]).unwrap();

    let sources = DataProcessor::new().process_directory(dir).expect("process");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].title, "a.txt");
    assert_eq!(sources[0].file_type, "Text File");
    assert_eq!(sources[0].text.trim(), "Short text");
    assert_eq!(sources[1].file_type, "Markdown");
}

#[test]
fn process_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let sources = DataProcessor::with_limit(1).process_directory(dir).expect("process limited");
    assert_eq!(sources.len(), 1, "limited to one source document");
}

#[test]
fn missing_directory_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = DataProcessor::new().process_directory(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn file_type_labels() {
    use std::path::Path;
    assert_eq!(file_type_label(Path::new("a.PDF")), "PDF Document");
    assert_eq!(file_type_label(Path::new("a.doc")), "Word Document");
    assert_eq!(file_type_label(Path::new("a.htm")), "HTML Document");
    assert_eq!(file_type_label(Path::new("a")), "Unknown");
}
