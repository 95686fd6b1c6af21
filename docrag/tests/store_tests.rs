//! Integration and property tests for the embedded vector stores.

mod support;

use std::collections::HashMap;

use docrag::{Chunk, InMemoryVectorStore, PersistentVectorStore, RagError, VectorStore};
use proptest::prelude::*;

/// A chunk with a one-hot-ish embedding along `axis`.
fn chunk_with_embedding(filename: &str, index: usize, axis: usize, dim: usize) -> Chunk {
    let mut chunk =
        Chunk::new(filename, "doc-1", index, format!("chunk {index} of {filename}")).unwrap();
    let mut embedding = vec![0.0f32; dim];
    embedding[axis % dim] = 1.0;
    chunk.embedding = Some(embedding);
    chunk.metadata.insert("filename".to_string(), filename.to_string());
    chunk
}

#[tokio::test]
async fn search_with_k_beyond_population_returns_everything_sorted() {
    let store = InMemoryVectorStore::new();
    let chunks: Vec<Chunk> =
        (0..3).map(|i| chunk_with_embedding("a.txt", i, i, 8)).collect();
    store.add(&chunks, "doc-1").await.unwrap();

    let mut query = vec![0.0f32; 8];
    query[0] = 1.0;
    query[1] = 0.5;

    let results = store.search(&query, 100, None).await.unwrap();
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(results[0].chunk_id, "a.txt_0");
}

#[tokio::test]
async fn add_rejects_chunks_without_embeddings() {
    let store = InMemoryVectorStore::new();
    let chunk = Chunk::new("a.txt", "doc-1", 0, "no embedding yet").unwrap();

    let result = store.add(&[chunk], "doc-1").await;
    assert!(matches!(result, Err(RagError::VectorStore { .. })));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn add_rejects_an_empty_chunk_list() {
    let store = InMemoryVectorStore::new();
    let result = store.add(&[], "doc-1").await;
    assert!(matches!(result, Err(RagError::VectorStore { .. })));
}

#[tokio::test]
async fn delete_document_removes_only_that_document() {
    let store = InMemoryVectorStore::new();
    let mut a: Vec<Chunk> = (0..2).map(|i| chunk_with_embedding("a.txt", i, i, 8)).collect();
    let mut b: Vec<Chunk> = (0..3).map(|i| chunk_with_embedding("b.txt", i, i, 8)).collect();
    for chunk in &mut a {
        chunk.document_id = "doc-a".to_string();
    }
    for chunk in &mut b {
        chunk.document_id = "doc-b".to_string();
    }
    store.add(&a, "doc-a").await.unwrap();
    store.add(&b, "doc-b").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 5);

    store.delete_document("doc-a").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    let filenames = store.list_indexed_documents().await.unwrap();
    assert!(!filenames.contains("a.txt"));
    assert!(filenames.contains("b.txt"));

    store.clear_all().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.list_indexed_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn metadata_filter_restricts_results() {
    let store = InMemoryVectorStore::new();
    let chunks: Vec<Chunk> = (0..4)
        .map(|i| chunk_with_embedding(if i % 2 == 0 { "even.txt" } else { "odd.txt" }, i, 0, 8))
        .collect();
    store.add(&chunks, "doc-1").await.unwrap();

    let query = {
        let mut q = vec![0.0f32; 8];
        q[0] = 1.0;
        q
    };
    let filter = HashMap::from([("filename".to_string(), "even.txt".to_string())]);
    let results = store.search(&query, 10, Some(&filter)).await.unwrap();

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.metadata.get("filename").map(String::as_str), Some("even.txt"));
    }
}

#[tokio::test]
async fn reindexing_overwrites_by_chunk_id() {
    let store = InMemoryVectorStore::new();
    let first = vec![chunk_with_embedding("a.txt", 0, 0, 8)];
    store.add(&first, "doc-1").await.unwrap();

    let mut second = vec![chunk_with_embedding("a.txt", 0, 1, 8)];
    second[0].text = "replacement text".to_string();
    store.add(&second, "doc-2").await.unwrap();

    // Same chunk id, last writer wins.
    assert_eq!(store.count().await.unwrap(), 1);
    let query = {
        let mut q = vec![0.0f32; 8];
        q[1] = 1.0;
        q
    };
    let results = store.search(&query, 1, None).await.unwrap();
    assert_eq!(results[0].text, "replacement text");
}

#[tokio::test]
async fn persistent_store_round_trips_across_reopen() {
    support::init_tracing();
    let dir = std::env::temp_dir().join(format!("docrag-test-{}", uuid::Uuid::new_v4()));

    {
        let store = PersistentVectorStore::open(&dir, "documents_local").await.unwrap();
        let chunks: Vec<Chunk> =
            (0..3).map(|i| chunk_with_embedding("a.txt", i, i, 8)).collect();
        store.add(&chunks, "doc-1").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
    }

    // Reopen from disk and search the persisted corpus.
    let store = PersistentVectorStore::open(&dir, "documents_local").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    let mut query = vec![0.0f32; 8];
    query[2] = 1.0;
    let results = store.search(&query, 1, None).await.unwrap();
    assert_eq!(results[0].chunk_id, "a.txt_2");

    // A different collection name must not see this corpus.
    let other = PersistentVectorStore::open(&dir, "documents_remote").await.unwrap();
    assert_eq!(other.count().await.unwrap(), 0);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

/// **Property: search results are ordered by descending score and bounded
/// by both `k` and the population.** (Adapted to the corpus-level store
/// contract.)
mod prop_search_ordering {
    use super::*;

    fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
        proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
            "non-zero embedding",
            |mut v| {
                let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm < 1e-8 {
                    return None;
                }
                for value in &mut v {
                    *value /= norm;
                }
                Some(v)
            },
        )
    }

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                let chunks: Vec<Chunk> = embeddings
                    .iter()
                    .enumerate()
                    .map(|(i, embedding)| {
                        let mut chunk =
                            Chunk::new("p.txt", "doc-1", i, format!("text {i}")).unwrap();
                        chunk.embedding = Some(embedding.clone());
                        chunk
                    })
                    .collect();
                store.add(&chunks, "doc-1").await.unwrap();
                store.search(&query, k, None).await.unwrap()
            });

            prop_assert!(results.len() <= k);
            prop_assert!(results.len() <= embeddings.len());
            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].score >= pair[1].score,
                    "results not in descending order: {} < {}",
                    pair[0].score,
                    pair[1].score,
                );
            }
            for result in &results {
                prop_assert!((0.0..=1.0).contains(&result.score));
            }
        }
    }
}
