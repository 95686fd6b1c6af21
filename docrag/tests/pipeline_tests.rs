//! End-to-end pipeline tests: index → retrieve → answer, with mock
//! providers.

mod support;

use std::sync::Arc;

use docrag::{Document, FileUpload, ImageAttachment, PlainTextExtractor, RagConfig, RagError};
use support::{
    FailingReranker, FailingVision, MockVision, SlowReranker, build_pipeline,
    build_pipeline_with,
};

fn config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .n_results(3)
        .request_timeout_secs(30)
        .build()
        .unwrap()
}

fn bike_doc() -> Document {
    let mut text = String::from(
        "Guide d'entretien du vélo de route\nRéglages, nettoyage et lubrification de la \
         transmission.\n\n",
    );
    for i in 0..10 {
        text.push_str(&format!(
            "Étape {i}: vérifier la chaîne du vélo, nettoyer la cassette et contrôler la \
             pression des pneus avant chaque sortie.\n\n"
        ));
    }
    Document::new("velo.txt", text).unwrap()
}

fn pastry_doc() -> Document {
    let mut text = String::from(
        "Recette de la tarte aux pommes\nPâte brisée maison et pommes caramélisées.\n\n",
    );
    for i in 0..10 {
        text.push_str(&format!(
            "Étape {i}: étaler la pâte, disposer les pommes en rosace et saupoudrer de \
             sucre avant d'enfourner la tarte.\n\n"
        ));
    }
    Document::new("tarte.txt", text).unwrap()
}

#[tokio::test]
async fn round_trip_retrieves_the_right_document() {
    support::init_tracing();
    let pipeline = build_pipeline();
    let config = config();

    pipeline.index(bike_doc(), &config).await.unwrap();
    pipeline.index(pastry_doc(), &config).await.unwrap();

    // Query the bike guide with its own header sentence.
    let results = pipeline
        .search("Guide d'entretien du vélo de route", &config, None)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(
        results[0].chunk_id.starts_with("velo.txt_"),
        "expected a velo.txt chunk on top, got {}",
        results[0].chunk_id
    );
}

#[tokio::test]
async fn indexing_attaches_chunks_and_stamps_metadata() {
    let pipeline = build_pipeline();
    let config = config();

    let document = pipeline.index(bike_doc(), &config).await.unwrap();
    assert!(document.chunk_count() > 1);

    for (i, chunk) in document.chunks.iter().enumerate() {
        assert!(chunk.embedding.is_some());
        assert_eq!(chunk.id, format!("velo.txt_{i}"));
        assert_eq!(chunk.metadata.get("filename").map(String::as_str), Some("velo.txt"));
        assert_eq!(
            chunk.metadata.get("document_id").map(String::as_str),
            Some(document.id.as_str())
        );
        assert_eq!(
            chunk.metadata.get("sequence_index").map(String::as_str),
            Some(i.to_string().as_str())
        );
    }
}

#[tokio::test]
async fn reindexing_same_file_overwrites_instead_of_duplicating() {
    let pipeline = build_pipeline();
    let config = config();

    let first = pipeline.index(bike_doc(), &config).await.unwrap();
    let count_after_first = pipeline.document_count(&config).await.unwrap();

    let second = pipeline.index(bike_doc(), &config).await.unwrap();
    let count_after_second = pipeline.document_count(&config).await.unwrap();

    assert_eq!(count_after_first, count_after_second);
    let first_ids: Vec<&str> = first.chunks.iter().map(|c| c.id.as_str()).collect();
    let second_ids: Vec<&str> = second.chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn empty_document_is_rejected_and_leaves_the_corpus_unchanged() {
    let pipeline = build_pipeline();
    let config = config();

    let result = pipeline.index(Document::new("vide.txt", "   ").unwrap(), &config).await;
    assert!(matches!(result, Err(RagError::Validation(_))));
    assert_eq!(pipeline.document_count(&config).await.unwrap(), 0);
}

#[tokio::test]
async fn query_without_context_still_answers() {
    let pipeline = build_pipeline();
    let config = config();

    let response = pipeline.query("question sans corpus", &[], &config, None).await.unwrap();
    assert!(response.sources.is_empty());
    assert!(response.answer.starts_with("mock answer"));
    assert_eq!(response.model_name, "mock-llm");
}

#[tokio::test]
async fn query_returns_ranked_sources_and_answer() {
    let pipeline = build_pipeline();
    let config = config();

    pipeline.index(bike_doc(), &config).await.unwrap();
    pipeline.index(pastry_doc(), &config).await.unwrap();

    let response = pipeline
        .query("comment nettoyer la chaîne du vélo", &[], &config, None)
        .await
        .unwrap();

    assert!(!response.sources.is_empty());
    assert!(response.sources.len() <= config.n_results);
    for pair in response.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(response.query.embedding.is_some());
}

#[tokio::test]
async fn failing_reranker_falls_back_to_hybrid_ranking() {
    let pipeline = build_pipeline_with(|builder| builder.reranker(Arc::new(FailingReranker)));
    let config = RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .n_results(3)
        .rerank_enabled(true)
        .request_timeout_secs(30)
        .build()
        .unwrap();

    pipeline.index(bike_doc(), &config).await.unwrap();

    let response = pipeline
        .query("pression des pneus du vélo", &[], &config, None)
        .await
        .unwrap();

    assert!(!response.sources.is_empty(), "fallback must still produce sources");
    assert_eq!(
        response.sources[0].metadata.get("score_type").map(String::as_str),
        Some("hybrid")
    );
}

#[tokio::test(start_paused = true)]
async fn reranker_timeout_falls_back_to_hybrid_ranking() {
    let pipeline = build_pipeline_with(|builder| builder.reranker(Arc::new(SlowReranker)));
    let config = RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .n_results(3)
        .rerank_enabled(true)
        .request_timeout_secs(5)
        .build()
        .unwrap();

    pipeline.index(bike_doc(), &config).await.unwrap();

    let response = pipeline
        .query("nettoyer la cassette du vélo", &[], &config, None)
        .await
        .unwrap();

    assert!(!response.sources.is_empty());
    for pair in response.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(
        response.sources[0].metadata.get("score_type").map(String::as_str),
        Some("hybrid")
    );
}

#[tokio::test]
async fn pure_semantic_mode_skips_bm25() {
    let pipeline = build_pipeline();
    let config = RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .n_results(2)
        .semantic_weight(1.0)
        .build()
        .unwrap();

    pipeline.index(bike_doc(), &config).await.unwrap();

    let results = pipeline.search("chaîne du vélo", &config, None).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 2);
    for result in &results {
        assert_eq!(result.metadata.get("score_type").map(String::as_str), Some("semantic"));
    }
}

#[tokio::test]
async fn empty_query_is_rejected_with_a_user_safe_message() {
    let pipeline = build_pipeline();
    let config = config();

    let error = pipeline.query("   ", &[], &config, None).await.unwrap_err();
    assert!(matches!(error, RagError::Validation(_)));
    // Validation messages pass through to the caller.
    assert!(error.user_message().contains("must not be empty"));
}

#[test]
fn internal_errors_surface_opaquely() {
    let error = RagError::Embedding {
        provider: "openai".into(),
        message: "secret diagnostic detail".into(),
    };
    let surfaced = error.user_message();
    assert!(!surfaced.contains("secret"));
    assert!(surfaced.contains("ref:"));
}

#[tokio::test]
async fn index_upload_extracts_and_indexes() {
    let pipeline = build_pipeline();
    let config = config();

    let file = FileUpload::new("notes.txt", b"Des notes sur le montage du pignon.".to_vec())
        .unwrap();
    let document = pipeline.index_upload(&PlainTextExtractor, &file, &config).await.unwrap();

    assert_eq!(document.filename, "notes.txt");
    assert_eq!(document.chunk_count(), 1);
    assert_eq!(pipeline.document_count(&config).await.unwrap(), 1);
}

#[tokio::test]
async fn vision_descriptions_become_extra_chunks() {
    let pipeline = build_pipeline_with(|builder| builder.vision(Arc::new(MockVision)));
    let config = RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .n_results(3)
        .vision_enabled(true)
        .build()
        .unwrap();

    let images = vec![
        ImageAttachment::new(vec![1, 2, 3], "image/png", "velo.txt page 1, image 1"),
        ImageAttachment::new(vec![4, 5, 6], "image/png", "velo.txt page 2, image 1"),
    ];
    let document = pipeline.index_with_images(bike_doc(), &images, &config).await.unwrap();

    let image_chunks: Vec<_> = document
        .chunks
        .iter()
        .filter(|c| c.metadata.get("kind").map(String::as_str) == Some("image_description"))
        .collect();
    assert_eq!(image_chunks.len(), 2);
    for chunk in &image_chunks {
        assert!(chunk.text.starts_with("[IMAGE: "));
        assert!(chunk.embedding.is_some());
    }
    // Image chunks continue the sequence, so ids stay unique per file.
    let text_chunks = document.chunk_count() - image_chunks.len();
    assert_eq!(image_chunks[0].sequence_index, text_chunks);
}

#[tokio::test]
async fn failed_image_description_skips_the_image_only() {
    let pipeline = build_pipeline_with(|builder| builder.vision(Arc::new(FailingVision)));
    let config = RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .n_results(3)
        .vision_enabled(true)
        .build()
        .unwrap();

    let images = vec![ImageAttachment::new(vec![1], "image/png", "broken image")];
    let document = pipeline.index_with_images(bike_doc(), &images, &config).await.unwrap();

    assert!(document.chunk_count() > 0);
    assert!(
        document
            .chunks
            .iter()
            .all(|c| c.metadata.get("kind").map(String::as_str) != Some("image_description"))
    );
}

#[tokio::test]
async fn delete_document_removes_it_from_the_corpus() {
    let pipeline = build_pipeline();
    let config = config();

    let document = pipeline.index(bike_doc(), &config).await.unwrap();
    pipeline.index(pastry_doc(), &config).await.unwrap();

    pipeline.delete_document(&document.id, &config).await.unwrap();

    let filenames = pipeline.indexed_documents(&config).await.unwrap();
    assert!(!filenames.contains("velo.txt"));
    assert!(filenames.contains("tarte.txt"));
}
