//! ragdb-core
//!
//! Shared data model, error taxonomy, configuration, chunking and the
//! document registry used by the text, vector and hybrid crates.
pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use error::{Error, Result};
pub use store::DocumentStore;
