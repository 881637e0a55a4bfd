//! Integration tests for the Gemini provider against a mock API

use futures::StreamExt;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use fractonix_engine::config::LLMConfig;
use fractonix_engine::llm::gemini::GeminiProvider;
use fractonix_engine::llm::{Content, GenerationConfig, LLMError, LLMProvider, Role};

fn provider(server: &MockServer) -> GeminiProvider {
    let config = LLMConfig {
        base_url: server.uri(),
        ..LLMConfig::default()
    };
    GeminiProvider::new(&config, "test-key").with_system_instruction("You are Fractonix AI")
}

fn candidate(text: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": {"maxOutputTokens": 300, "temperature": 0.4},
            "systemInstruction": {"parts": [{"text": "You are Fractonix AI"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("A short digest")))
        .expect(1)
        .mount(&server)
        .await;

    let text = provider(&server)
        .generate(
            &[Content::text(Role::User, "Summarize this chat")],
            GenerationConfig::new(300, 0.4),
        )
        .await
        .unwrap();

    assert_eq!(text, "A short digest");
}

#[tokio::test]
async fn test_generate_maps_status_codes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(
            &[Content::text(Role::User, "hi")],
            GenerationConfig::new(10, 0.7),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::RateLimitExceeded));
}

#[tokio::test]
async fn test_generate_rejects_bad_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(
            &[Content::text(Role::User, "hi")],
            GenerationConfig::new(10, 0.7),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_stream_yields_deltas_in_order() {
    let server = MockServer::start().await;

    let body: String = ["Hel", "lo", " world"]
        .iter()
        .map(|t| format!("data: {}\r\n\r\n", candidate(t)))
        .collect();

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "What is 2+2?"}]}],
            "generationConfig": {"maxOutputTokens": 4096}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let stream = provider(&server)
        .generate_stream(
            &[Content::text(Role::User, "What is 2+2?")],
            GenerationConfig::new(4096, 0.7),
        )
        .await
        .unwrap();

    let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
    assert_eq!(deltas, vec!["Hel", "lo", " world"]);
}

#[tokio::test]
async fn test_stream_open_failure_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = provider(&server)
        .generate_stream(
            &[Content::text(Role::User, "hi")],
            GenerationConfig::new(10, 0.7),
        )
        .await;

    assert!(matches!(result, Err(LLMError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_stream_error_event_is_yielded() {
    let server = MockServer::start().await;

    let body = format!(
        "data: {}\n\ndata: {}\n\n",
        candidate("partial"),
        json!({"error": {"code": 500, "message": "internal"}})
    );

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let items: Vec<_> = provider(&server)
        .generate_stream(
            &[Content::text(Role::User, "hi")],
            GenerationConfig::new(10, 0.7),
        )
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "partial");
    assert!(items[1].is_err());
}
