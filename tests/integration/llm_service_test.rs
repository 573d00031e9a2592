// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use jobharvest::config::settings::LlmSettings;
use jobharvest::domain::models::job::{ExperienceLevel, WorkModel};
use jobharvest::domain::services::llm_service::{FieldInference, InferenceError, LlmService};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> LlmSettings {
    LlmSettings {
        api_key: Some("test-key".to_string()),
        api_base_url: format!("{}/v1", server.uri()),
        parse_models: vec!["parse-a".to_string(), "parse-b".to_string()],
        inference_model: "infer-model".to_string(),
        timeout_secs: 5,
    }
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

#[tokio::test]
async fn test_parse_job_posting_rotates_models() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "parse-b" })))
        .respond_with(completion("{\"description\": \"Build APIs\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let service = LlmService::new(&settings(&server)).unwrap();
    let raw = service.parse_job_posting("# Rust Engineer", 3).await.unwrap();

    assert_eq!(raw, "{\"description\": \"Build APIs\"}");
}

#[tokio::test]
async fn test_infer_work_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "infer-model" })))
        .respond_with(completion("  Hybrid \n"))
        .mount(&server)
        .await;

    let service = LlmService::new(&settings(&server)).unwrap();

    assert_eq!(
        service.infer_work_model("Two days a week in the office").await.unwrap(),
        Some(WorkModel::Hybrid)
    );
}

#[tokio::test]
async fn test_unexpected_answer_is_no_inference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("Flexible"))
        .mount(&server)
        .await;

    let service = LlmService::new(&settings(&server)).unwrap();

    assert_eq!(service.infer_work_model("Work from anywhere").await.unwrap(), None);
}

#[tokio::test]
async fn test_infer_experience_level_is_case_insensitive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("Lead+"))
        .mount(&server)
        .await;

    let service = LlmService::new(&settings(&server)).unwrap();
    let level = service
        .infer_experience_level("Engineering Manager", "Lead a team of eight engineers")
        .await
        .unwrap();

    assert_eq!(level, Some(ExperienceLevel::LeadPlus));
}

#[tokio::test]
async fn test_api_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
        .mount(&server)
        .await;

    let service = LlmService::new(&settings(&server)).unwrap();
    let err = service.parse_job_posting("# Rust Engineer", 0).await.unwrap_err();

    match err {
        InferenceError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limit exceeded");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_missing_content_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let service = LlmService::new(&settings(&server)).unwrap();
    let err = service.infer_work_model("Remote").await.unwrap_err();

    assert!(matches!(err, InferenceError::InvalidResponse(_)));
}
