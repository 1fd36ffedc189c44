//! ragdb-text
//!
//! BM25 lexical index over chunk text. Tokenization reuses tantivy's text
//! analysis chain; postings, statistics and scoring are kept in memory so
//! every score can be explained term by term.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::LexicalIndex;
pub use tantivy_utils::Analyzer;
