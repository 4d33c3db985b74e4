use std::time::Duration;

use docrag_core::{Embedder, Error};
use docrag_embed::OllamaEmbedder;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embedder(server: &MockServer, dim: usize) -> OllamaEmbedder {
    OllamaEmbedder::new(&server.uri(), "nomic-embed-text", dim, Duration::from_secs(5))
}

async fn embed_batch_blocking(e: OllamaEmbedder, texts: Vec<String>) -> docrag_core::Result<Vec<Vec<f32>>> {
    tokio::task::spawn_blocking(move || e.embed_batch(&texts)).await.expect("join")
}

#[tokio::test(flavor = "multi_thread")]
async fn embeds_batch_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "nomic-embed-text", "input": ["a", "b"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = embed_batch_blocking(embedder(&server, 3), vec!["a".into(), "b".into()]).await.expect("embed");
    assert_eq!(out, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_batch_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let out = embed_batch_blocking(embedder(&server, 3), vec![]).await.expect("embed");
    assert!(out.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn count_mismatch_is_embedding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0, 0.0, 0.0]] })))
        .mount(&server)
        .await;

    let err = embed_batch_blocking(embedder(&server, 3), vec!["a".into(), "b".into()]).await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingFailure(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_embedding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = embed_batch_blocking(embedder(&server, 3), vec!["a".into()]).await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingFailure(_)), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_dimension_is_embedding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0, 0.0]] })))
        .mount(&server)
        .await;

    let e = embedder(&server, 3);
    let err = tokio::task::spawn_blocking(move || e.embed("a")).await.expect("join").unwrap_err();
    assert!(matches!(err, Error::EmbeddingFailure(_)), "got {err:?}");
}
