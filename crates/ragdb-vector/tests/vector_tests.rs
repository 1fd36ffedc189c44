use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ragdb_core::error::Result;
use ragdb_core::traits::EmbeddingProvider;
use ragdb_core::types::{Chunk, SourceKind};
use ragdb_core::Error;
use ragdb_embed::HashEmbedder;
use ragdb_vector::{CachedEmbeddingProvider, VectorIndex};

fn embedded(index: usize, vector: Vec<f32>) -> Chunk {
    let mut c = Chunk::new("doc", index, format!("chunk {index}"), 2);
    c.attach_embedding(vector).unwrap();
    c
}

#[test]
fn mismatched_dimension_leaves_index_unchanged() {
    let index = VectorIndex::new(3).unwrap();
    index.add(&[embedded(0, vec![1.0, 0.0, 0.0])]).unwrap();
    let err = index.add(&[embedded(1, vec![0.0, 1.0, 0.0]), embedded(2, vec![1.0, 1.0])]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2, .. }));
    assert_eq!(index.statistics().total_vectors, 1);
    assert!(!index.contains("doc_chunk_1"));

    let missing = Chunk::new("doc", 9, "no vector".into(), 2);
    assert!(matches!(index.add(&[missing]), Err(Error::Operation(_))));
    assert!(matches!(index.search(&[1.0, 0.0], 5), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn results_are_sorted_by_confidence_and_bounded() {
    let index = VectorIndex::new(2).unwrap();
    index
        .add(&[embedded(0, vec![0.0, 1.0]), embedded(1, vec![1.0, 0.0]), embedded(2, vec![1.0, 1.0]), embedded(3, vec![-1.0, 0.0])])
        .unwrap();
    let hits = index.search(&[1.0, 0.0], 10).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["doc_chunk_1", "doc_chunk_2", "doc_chunk_0", "doc_chunk_3"]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    for h in &hits {
        assert!((0.0..=1.0).contains(&h.score));
        assert_eq!(h.source, SourceKind::Vector);
    }
    assert_eq!(index.search(&[1.0, 0.0], 2).unwrap().len(), 2);
    assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
}

#[test]
fn equal_similarities_keep_insertion_order() {
    let index = VectorIndex::new(2).unwrap();
    index.add(&[embedded(5, vec![1.0, 0.0]), embedded(1, vec![2.0, 0.0]), embedded(3, vec![0.5, 0.0])]).unwrap();
    let ids: Vec<String> = index.search(&[1.0, 0.0], 3).unwrap().into_iter().map(|h| h.chunk_id).collect();
    assert_eq!(ids, vec!["doc_chunk_5", "doc_chunk_1", "doc_chunk_3"]);
}

#[test]
fn similarity_and_removal() {
    let index = VectorIndex::new(2).unwrap();
    index.add(&[embedded(0, vec![1.0, 0.0]), embedded(1, vec![0.0, 1.0])]).unwrap();
    assert_eq!(index.similarity("doc_chunk_1", &[0.0, 2.0]).unwrap(), Some(1.0));
    assert_eq!(index.similarity("missing", &[0.0, 2.0]).unwrap(), None);

    assert_eq!(index.remove_chunks(&["doc_chunk_0".to_string()]), 1);
    let stats = index.statistics();
    assert_eq!(stats.total_vectors, 1);
    assert_eq!(stats.dimension, 2);
    assert_eq!(index.search(&[1.0, 0.0], 5).unwrap()[0].chunk_id, "doc_chunk_1");
    assert_eq!(index.similarity("doc_chunk_1", &[0.0, 1.0]).unwrap(), Some(1.0));
}

#[test]
fn concurrent_reads_and_writes() {
    let index = Arc::new(VectorIndex::new(4).unwrap());
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..50 {
                    let id = w * 100 + i;
                    index.add(&[embedded(id, vec![1.0, w as f32, i as f32, 1.0])]).unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for _ in 0..50 {
                    let hits = index.search(&[1.0, 0.0, 0.0, 1.0], 5).unwrap();
                    assert!(hits.len() <= 5);
                    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
                }
            })
        })
        .collect();
    for h in writers.into_iter().chain(readers) { h.join().unwrap(); }
    assert_eq!(index.statistics().total_vectors, 200);
}

struct CountingProvider {
    inner: HashEmbedder,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn id(&self) -> &str { self.inner.id() }
    fn dim(&self) -> usize { self.inner.dim() }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed(texts).await
    }
}

#[tokio::test]
async fn cache_embeds_each_text_once_in_batches() {
    let counting = Arc::new(CountingProvider { inner: HashEmbedder::new(32).unwrap(), calls: AtomicUsize::new(0), texts: AtomicUsize::new(0) });
    let cached = CachedEmbeddingProvider::new(counting.clone(), 2);
    let texts: Vec<String> = ["a b", "c d", "a b", "e f", "g h"].iter().map(|s| s.to_string()).collect();

    let first = cached.embed(&texts).await.unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first[0], first[2]);
    assert_eq!(counting.texts.load(Ordering::SeqCst), 4);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    assert_eq!(cached.len(), 4);

    let again = cached.embed(&texts).await.unwrap();
    assert_eq!(again, first);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2, "second call served from cache");
    assert_eq!(cached.id(), "hash:d32");
}

#[tokio::test]
async fn cache_evicts_oldest_entries_beyond_capacity() {
    let counting = Arc::new(CountingProvider { inner: HashEmbedder::new(32).unwrap(), calls: AtomicUsize::new(0), texts: AtomicUsize::new(0) });
    let cached = CachedEmbeddingProvider::new(counting.clone(), 8).with_capacity(2);
    let texts: Vec<String> = ["one", "two", "three"].iter().map(|s| s.to_string()).collect();
    cached.embed(&texts).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(counting.texts.load(Ordering::SeqCst), 3);

    cached.embed(&texts[1..]).await.unwrap();
    assert_eq!(counting.texts.load(Ordering::SeqCst), 3, "two newest entries are still cached");

    cached.embed(&texts[..1]).await.unwrap();
    assert_eq!(counting.texts.load(Ordering::SeqCst), 4, "oldest entry was evicted");
    assert_eq!(cached.len(), 2);
}

struct ShortProvider;

#[async_trait]
impl EmbeddingProvider for ShortProvider {
    fn id(&self) -> &str { "short" }
    fn dim(&self) -> usize { 4 }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![0.0; 4]).collect())
    }
}

#[tokio::test]
async fn wrong_vector_count_is_an_embedding_error() {
    let cached = CachedEmbeddingProvider::new(Arc::new(ShortProvider), 8);
    let err = cached.embed(&["x".to_string(), "y".to_string()]).await.unwrap_err();
    assert!(matches!(err, Error::Embedding { ref provider, .. } if provider == "short"));
    assert!(cached.is_empty());
}
