//! Ollama client tests against a local stand-in for the Ollama API

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use nova::chat::{
    Assistant, ChatBackend, ChatMessage, ChatSession, OllamaChatClient, Personality,
    PersonalityKind,
};
use nova::memory::MemoryManager;
use nova::NovaError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Answers "hola <n messages>" in one piece, or as three NDJSON lines when
/// streaming. Model "missing" gets a 404.
async fn fake_chat(Json(req): Json<Value>) -> axum::response::Response {
    let model = req["model"].as_str().unwrap_or_default();
    if model == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("model '{}' not found", model) })),
        )
            .into_response();
    }

    let count = req["messages"].as_array().map(|m| m.len()).unwrap_or(0);
    if req["stream"].as_bool().unwrap_or(false) {
        let lines = [
            json!({ "message": { "role": "assistant", "content": "ho" }, "done": false }),
            json!({ "message": { "role": "assistant", "content": "la " }, "done": false }),
            json!({ "message": { "role": "assistant", "content": count.to_string() }, "done": false }),
            json!({ "message": { "role": "assistant", "content": "" }, "done": true }),
        ];
        let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        return ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response();
    }

    Json(json!({
        "model": model,
        "message": { "role": "assistant", "content": format!("hola {}", count) },
        "done": true
    }))
    .into_response()
}

async fn fake_tags() -> Json<Value> {
    Json(json!({ "models": [{ "name": "openchat:latest" }, { "name": "llama3:8b" }] }))
}

/// Serve the stand-in on an ephemeral port; returns its base URL
async fn spawn_fake_ollama() -> String {
    let app = Router::new()
        .route("/api/chat", post(fake_chat))
        .route("/api/tags", get(fake_tags));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, model: &str) -> OllamaChatClient {
    OllamaChatClient::with_config(base_url, model, Duration::from_secs(5)).unwrap()
}

fn conversation() -> Vec<ChatMessage> {
    vec![ChatMessage::system("sé breve"), ChatMessage::user("hola")]
}

#[tokio::test]
async fn test_chat_returns_message_content() {
    let base = spawn_fake_ollama().await;
    let reply = client(&base, "openchat").chat(&conversation()).await.unwrap();
    assert_eq!(reply, "hola 2");
}

#[tokio::test]
async fn test_chat_maps_http_errors() {
    let base = spawn_fake_ollama().await;
    let err = client(&base, "missing").chat(&conversation()).await.unwrap_err();
    match err {
        NovaError::OllamaApi(message) => {
            assert!(message.starts_with("HTTP 404"), "{}", message);
            assert!(message.contains("not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_stream_yields_fragments() {
    let base = spawn_fake_ollama().await;
    let stream = client(&base, "openchat")
        .chat_stream(&conversation())
        .await
        .unwrap();
    let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
    assert_eq!(fragments, vec!["ho", "la ", "2"]);
}

#[tokio::test]
async fn test_streaming_backend_concatenates() {
    let base = spawn_fake_ollama().await;
    let backend = client(&base, "openchat");
    let mut seen = Vec::new();
    let reply = backend
        .chat_streaming(&conversation(), &mut |f: &str| seen.push(f.to_string()))
        .await
        .unwrap();
    assert_eq!(reply, "hola 2");
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn test_models_and_health() {
    let base = spawn_fake_ollama().await;
    let ollama = client(&base, "openchat");
    assert!(ollama.health_check().await);
    assert_eq!(
        ollama.list_models().await.unwrap(),
        vec!["openchat:latest", "llama3:8b"]
    );
    assert!(ollama.model_available().await.unwrap());
    assert!(!client(&base, "mistral").model_available().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_server() {
    let ollama = OllamaChatClient::with_config(
        "http://127.0.0.1:9",
        "openchat",
        Duration::from_secs(1),
    )
    .unwrap();
    assert!(!ollama.health_check().await);
    assert!(ollama.chat(&conversation()).await.is_err());
}

#[tokio::test]
async fn test_assistant_over_ollama_client() {
    let base = spawn_fake_ollama().await;
    let memory = Arc::new(MemoryManager::in_memory().unwrap());
    let nova = Assistant::new(
        Arc::new(client(&base, "openchat")),
        memory.clone(),
        Personality::new(PersonalityKind::Cyberpunk),
    );
    let mut session = ChatSession::new();

    let first = nova.respond(&mut session, "Me llamo Ana").await.unwrap();
    assert_eq!(first.text, "hola 2");
    assert!(!first.degraded);

    // system + previous exchange + new message
    let second = nova.respond(&mut session, "¿te acuerdas?").await.unwrap();
    assert_eq!(second.text, "hola 4");
    assert_eq!(memory.facts_by_category()["personal"]["nombre"], "Ana");
    assert_eq!(memory.recent_turns(10).len(), 2);
}

#[tokio::test]
async fn test_assistant_streams_ollama_fragments() {
    let base = spawn_fake_ollama().await;
    let memory = Arc::new(MemoryManager::in_memory().unwrap());
    let nova = Assistant::new(
        Arc::new(client(&base, "openchat")),
        memory.clone(),
        Personality::new(PersonalityKind::Neutral),
    );
    let mut session = ChatSession::new();
    let mut fragments: Vec<String> = Vec::new();

    let reply = nova
        .respond_with(&mut session, "hola", &mut |f: &str| fragments.push(f.to_string()))
        .await
        .unwrap();
    assert_eq!(fragments, vec!["ho", "la ", "2"]);
    assert_eq!(reply.text, "hola 2");
    assert_eq!(memory.recent_turns(1)[0].assistant_text, "hola 2");
}
