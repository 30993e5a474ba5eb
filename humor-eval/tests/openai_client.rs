//! OpenAI-compatible client against a mock server

use humor_eval::dataset::ImagePayload;
use humor_eval::providers::{AnswerMode, OpenAIClient, ProviderError, VisionModel, VisionRequest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> VisionRequest {
    VisionRequest::new(
        ImagePayload::new(vec![1, 2, 3], "image/png"),
        "Question: which caption?",
        32,
        AnswerMode::Reasoned,
    )
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "model": "Xkev/Llama-3.2V-11B-cot",
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 14 }
    })
}

#[tokio::test]
async fn completes_against_local_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "Xkev/Llama-3.2V-11B-cot",
            "max_tokens": 32,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": "data:image/png;base64,AQID" } },
                    { "type": "text", "text": "Question: which caption?" }
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "  <think>the pun</think><answer>D</answer>\n",
        )))
        .mount(&mock_server)
        .await;

    let client = OpenAIClient::new(None)
        .with_base_url(format!("{}/v1/", mock_server.uri()))
        .with_model("Xkev/Llama-3.2V-11B-cot");

    let response = client.complete(&request()).await.unwrap();
    assert_eq!(response.content, "<think>the pun</think><answer>D</answer>");
    assert_eq!(response.input_tokens, 120);
    assert_eq!(response.output_tokens, 14);
    assert_eq!(response.finish_reason, "stop");
    assert_eq!(client.rate_limiter().current_token_usage().await, 134);
}

#[tokio::test]
async fn sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("A")))
        .mount(&mock_server)
        .await;

    let client = OpenAIClient::new(Some("sk-test".to_string())).with_base_url(mock_server.uri());
    assert_eq!(client.complete(&request()).await.unwrap().content, "A");
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({ "error": { "message": "slow down", "type": "requests" } })),
        )
        .mount(&mock_server)
        .await;

    let client = OpenAIClient::new(None).with_base_url(mock_server.uri());
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { retry_after_ms: 7000 }));
}

#[tokio::test]
async fn exhausted_quota_is_not_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "You exceeded your current quota", "type": "insufficient_quota" }
        })))
        .mount(&mock_server)
        .await;

    let client = OpenAIClient::new(None).with_base_url(mock_server.uri());
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Config(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_errors_surface_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream crashed"))
        .mount(&mock_server)
        .await;

    let client = OpenAIClient::new(None).with_base_url(mock_server.uri());
    match client.complete(&request()).await.unwrap_err() {
        ProviderError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream crashed"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn empty_choices_is_a_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "model": "m", "choices": [] })))
        .mount(&mock_server)
        .await;

    let client = OpenAIClient::new(None).with_base_url(mock_server.uri());
    assert!(matches!(
        client.complete(&request()).await,
        Err(ProviderError::Parse(_))
    ));
}
