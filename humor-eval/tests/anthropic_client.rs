//! Anthropic messages client against a mock server

use humor_eval::dataset::ImagePayload;
use humor_eval::providers::{AnswerMode, AnthropicClient, ProviderError, VisionModel, VisionRequest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(mode: AnswerMode) -> VisionRequest {
    VisionRequest::new(
        ImagePayload::new(vec![1, 2, 3], "image/png"),
        "Question: which caption?",
        32,
        mode,
    )
    .with_temperature(0.0)
}

fn message(content: serde_json::Value) -> serde_json::Value {
    json!({
        "model": "claude-sonnet-4-5-20250929",
        "content": content,
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 200, "output_tokens": 20 }
    })
}

fn client(server: &MockServer) -> AnthropicClient {
    AnthropicClient::new("sk-ant-test".to_string()).with_base_url(format!("{}/v1/", server.uri()))
}

async fn sent_body(server: &MockServer) -> serde_json::Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_json::from_slice(&requests[0].body).unwrap()
}

#[tokio::test]
async fn completes_with_image_block_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-sonnet-4-5-20250929",
            "max_tokens": 32,
            "temperature": 0.0,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image", "source": { "type": "base64", "media_type": "image/png", "data": "AQID" } },
                    { "type": "text", "text": "Question: which caption?" }
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message(json!([
            { "type": "text", "text": " <answer>C</answer>\n" }
        ]))))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let response = client.complete(&request(AnswerMode::Simple)).await.unwrap();
    assert_eq!(response.content, "<answer>C</answer>");
    assert_eq!(response.input_tokens, 200);
    assert_eq!(response.output_tokens, 20);
    assert_eq!(response.finish_reason, "end_turn");
    assert_eq!(client.rate_limiter().current_token_usage().await, 220);
}

#[tokio::test]
async fn reasoned_mode_enables_thinking_without_temperature() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "max_tokens": 32 + 1024,
            "thinking": { "type": "enabled", "budget_tokens": 1024 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message(json!([
            { "type": "thinking", "thinking": "the dog is the punchline" },
            { "type": "text", "text": "<answer>B</answer>" }
        ]))))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server).with_thinking_budget(1024);
    let response = client.complete(&request(AnswerMode::Reasoned)).await.unwrap();
    assert_eq!(
        response.content,
        "<think>the dog is the punchline</think><answer>B</answer>"
    );

    let body = sent_body(&mock_server).await;
    assert!(body.get("temperature").is_none());
}

#[tokio::test]
async fn simple_mode_never_sends_thinking() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message(json!([
            { "type": "text", "text": "A" }
        ]))))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server).with_thinking_budget(1024);
    assert_eq!(client.complete(&request(AnswerMode::Simple)).await.unwrap().content, "A");

    let body = sent_body(&mock_server).await;
    assert!(body.get("thinking").is_none());
    assert_eq!(body["max_tokens"], 32);
    assert_eq!(body["temperature"], 0.0);
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "3")
                .set_body_json(json!({ "type": "error", "error": { "type": "rate_limit_error", "message": "slow down" } })),
        )
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).complete(&request(AnswerMode::Simple)).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { retry_after_ms: 3000 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn auth_failures_are_config_errors() {
    for status in [401, 403] {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })))
            .mount(&mock_server)
            .await;

        match client(&mock_server).complete(&request(AnswerMode::Simple)).await.unwrap_err() {
            ProviderError::Config(message) => {
                assert!(message.contains(&status.to_string()));
                assert!(message.contains("invalid x-api-key"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}

#[tokio::test]
async fn overloaded_is_an_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": { "type": "overloaded_error", "message": "Overloaded" }
        })))
        .mount(&mock_server)
        .await;

    match client(&mock_server).complete(&request(AnswerMode::Simple)).await.unwrap_err() {
        ProviderError::Api { status, message } => {
            assert_eq!(status, 529);
            assert_eq!(message, "Overloaded");
        }
        other => panic!("unexpected error: {}", other),
    }
}
