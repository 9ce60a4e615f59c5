use httpmock::prelude::*;
use serde_json::json;

use jobhunt::config::OracleConfig;
use jobhunt::error::OracleError;
use jobhunt::scoring::{GeminiOracle, SemanticOracle};

const PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn oracle(server: &MockServer) -> GeminiOracle {
    let config = OracleConfig {
        endpoint: server.base_url(),
        ..OracleConfig::default()
    };
    GeminiOracle::new(&config, "test-key".to_string()).unwrap()
}

fn answer(text: &str) -> serde_json::Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

#[tokio::test]
async fn posts_prompt_with_key_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(PATH)
                .header("x-goog-api-key", "test-key");
            then.status(200).json_body(answer(" 4\n"));
        })
        .await;

    let text = oracle(&server)
        .complete("What is 2+2? Answer with just the number.")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(text, "4");
}

#[tokio::test]
async fn score_parses_first_number() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200)
                .json_body(answer("Relevance: 0.85 overall, weighing skills heavily."));
        })
        .await;

    let score = oracle(&server).score("rate this job").await.unwrap();
    assert!((score - 0.85).abs() < f64::EPSILON);
}

#[tokio::test]
async fn fill_reads_fenced_json() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(answer(
                "```json\n{\"salary\": \"PKR 200,000\", \"experience\": \"2 years\"}\n```",
            ));
        })
        .await;

    let fields = oracle(&server).fill_missing_fields("fill").await.unwrap();
    assert_eq!(fields["salary"], "PKR 200,000");
    assert_eq!(fields["experience"], "2 years");
}

#[tokio::test]
async fn error_status_carries_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(429).body("quota exceeded");
        })
        .await;

    let err = oracle(&server).complete("hello").await.unwrap_err();
    assert_eq!(
        err,
        OracleError::Status {
            status: 429,
            body: "quota exceeded".to_string()
        }
    );
}

#[tokio::test]
async fn missing_candidates_is_empty_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(json!({ "candidates": [] }));
        })
        .await;

    let err = oracle(&server).complete("hello").await.unwrap_err();
    assert_eq!(err, OracleError::EmptyResponse);
}
