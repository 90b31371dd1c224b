use base64::{ engine::general_purpose::STANDARD, Engine };
use reqwest::StatusCode;
use serde_json::json;
use shniro::llm::chat::gemini::GeminiChatClient;
use shniro::llm::chat::groq::GroqChatClient;
use shniro::llm::chat::{ ChatClient, ChatOutcome, FallbackClient, ImageInput, VisionClient };
use shniro::llm::ProviderError;
use shniro::models::chat::ConversationTurn;
use wiremock::matchers::{ body_json, header, method, path, query_param };
use wiremock::{ Mock, MockServer, ResponseTemplate };

fn groq(server: &MockServer) -> GroqChatClient {
    GroqChatClient::new("gsk-test".into(), Some("llama-test".into()), Some(server.uri())).unwrap()
}

fn gemini(server: &MockServer) -> GeminiChatClient {
    GeminiChatClient::new("g-test".into(), Some("gemini-test".into()), Some(server.uri())).unwrap()
}

#[tokio::test]
async fn groq_sends_history_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(
            body_json(
                json!({
                "model": "llama-test",
                "messages": [
                    {"role": "user", "content": "What is 2+2?"},
                    {"role": "assistant", "content": "4"},
                    {"role": "user", "content": "And 3+3?"}
                ],
                "temperature": 0.3
            })
            )
        )
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({"choices": [{"message": {"role": "assistant", "content": "6"}}]})
            )
        )
        .expect(1)
        .mount(&server).await;

    let history = vec![
        ConversationTurn::user("What is 2+2?"),
        ConversationTurn::assistant("4"),
        ConversationTurn::user("And 3+3?")
    ];
    let outcome = groq(&server).chat(&history, 0.3).await.unwrap();
    assert_eq!(outcome, ChatOutcome::Completed(Some("6".into())));
}

#[tokio::test]
async fn groq_error_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server).await;

    let outcome = groq(&server).chat(&[ConversationTurn::user("hi")], 0.3).await.unwrap();
    assert_eq!(outcome, ChatOutcome::Rejected(StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn groq_success_without_content_completes_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server).await;

    let outcome = groq(&server).chat(&[ConversationTurn::user("hi")], 0.3).await.unwrap();
    assert_eq!(outcome, ChatOutcome::Completed(None));
}

#[tokio::test]
async fn groq_non_json_success_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server).await;

    let err = groq(&server).chat(&[ConversationTurn::user("hi")], 0.3).await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)), "{:?}", err);
}

#[tokio::test]
async fn gemini_vision_sends_inline_image_and_joins_parts() {
    let server = MockServer::start().await;
    let bytes = vec![0x89, b'P', b'N', b'G'];
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(query_param("key", "g-test"))
        .and(
            body_json(
                json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode(&bytes)}},
                        {"text": "What is this?"}
                    ]
                }]
            })
            )
        )
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({"candidates": [{"content": {"parts": [{"text": "A"}, {"text": "logo"}]}}]})
            )
        )
        .expect(1)
        .mount(&server).await;

    let image = ImageInput { mime_type: "image/png".into(), bytes };
    let answer = gemini(&server).describe(&image, "What is this?").await.unwrap();
    assert_eq!(answer.as_deref(), Some("A\n\nlogo"));
}

#[tokio::test]
async fn gemini_vision_without_candidates_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server).await;

    let image = ImageInput { mime_type: "image/jpeg".into(), bytes: vec![1, 2, 3] };
    assert_eq!(gemini(&server).describe(&image, "?").await.unwrap(), None);
}

#[tokio::test]
async fn gemini_fallback_sends_question_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(query_param("key", "g-test"))
        .and(body_json(json!({"contents": [{"role": "user", "parts": [{"text": "Why?"}]}]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({"candidates": [{"content": {"parts": [{"text": "Because."}, {"text": "ignored"}]}}]})
            )
        )
        .expect(1)
        .mount(&server).await;

    assert_eq!(gemini(&server).ask("Why?").await.unwrap().as_deref(), Some("Because."));
}

#[tokio::test]
async fn gemini_error_status_means_no_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": {"code": 500, "message": "boom"}}))
        )
        .mount(&server).await;

    assert_eq!(gemini(&server).ask("Why?").await.unwrap(), None);
}
