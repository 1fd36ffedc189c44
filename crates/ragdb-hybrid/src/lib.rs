//! ragdb-hybrid
//!
//! Fuses dense and BM25 retrieval into one ranked, cited result list and
//! exposes the upload/search/explain/stats surface through `RagEngine`.
pub mod citation;
pub mod engine;
pub mod fusion;
pub mod rerank;
pub mod retriever;

pub use citation::CitationBuilder;
pub use engine::{DeleteReceipt, EngineStats, RagEngine, UploadReceipt};
pub use retriever::{HybridRetriever, RetrievalExplanation, RetrievalWithCitations, RetrieverStats};
