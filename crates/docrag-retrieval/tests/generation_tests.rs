use std::time::Duration;

use docrag_core::{Error, Generator};
use docrag_retrieval::OllamaGenerator;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator(server: &MockServer) -> OllamaGenerator {
    OllamaGenerator::new(&server.uri(), "mistral", "You are an AI assistant specialized in document analysis.", Duration::from_secs(5))
}

#[tokio::test(flavor = "multi_thread")]
async fn posts_prompt_and_returns_response_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "mistral",
            "prompt": "Context:\nA\n\nQuestion: q\n\nAnswer:",
            "system": "You are an AI assistant specialized in document analysis.",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "model": "mistral", "response": "  The total is $500.\n", "done": true })))
        .expect(1)
        .mount(&server)
        .await;

    let g = generator(&server);
    let out = tokio::task::spawn_blocking(move || g.generate("Context:\nA\n\nQuestion: q\n\nAnswer:")).await.unwrap();
    assert_eq!(out.expect("generate"), "  The total is $500.\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_generation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let g = generator(&server);
    let err = tokio::task::spawn_blocking(move || g.generate("p")).await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_generation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let g = generator(&server);
    let err = tokio::task::spawn_blocking(move || g.generate("p")).await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}
