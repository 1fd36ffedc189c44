//! ragdb-vector
//!
//! In-memory dense index (exact cosine over every stored vector) and the
//! content-hash embedding cache that sits in front of a provider.
pub mod cache;
pub mod index;

pub use cache::CachedEmbeddingProvider;
pub use index::VectorIndex;
