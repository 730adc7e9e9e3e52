//! Integration test: run an in-process OpenAI-compatible server on a free port and drive the real
//! HTTP client through the media-rejection retry. Does not need network access.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::{Arc, Mutex};
use triage::classify::ClassificationClient;
use triage::config::ServiceConfig;
use triage::llm::{ClassificationRequest, LlmError, OpenAiClient};

#[derive(Clone, Default)]
struct Seen {
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

fn has_image_part(body: &serde_json::Value) -> bool {
    body["messages"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|m| m["content"].as_array())
        .flatten()
        .any(|part| part["type"] == "image_url")
}

/// Rejects any request with an image part, answers text-only requests with a fixed classification.
async fn chat_completions(
    State(seen): State<Seen>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let with_image = has_image_part(&body);
    seen.bodies.lock().unwrap().push(body);
    if with_image {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": {
                    "message": "Timeout while downloading https://cdn.example.com/gone.png.",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_image_url"
                }
            })),
        );
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "{\"assunto\":\"Atraso\",\"sentiment\":\"negativo\",\"response\":\"Olá, Ana! Pedimos desculpas pelo atraso.\"}"
                }
            }]
        })),
    )
}

async fn start_server() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/v1", addr), seen)
}

fn service(base_url: String) -> ServiceConfig {
    ServiceConfig {
        base_url,
        model: "test-model".to_string(),
        timeout_secs: 5,
        ..ServiceConfig::default()
    }
}

fn request_with_media() -> ClassificationRequest {
    ClassificationRequest {
        system: "sistema".to_string(),
        text: "1 - Meu pedido está atrasado".to_string(),
        media: vec!["https://cdn.example.com/gone.png".to_string()],
        media_note: Some("O cliente também enviou 1 imagem(ns), anexada(s) a esta mensagem.".to_string()),
    }
}

#[tokio::test]
async fn rejected_media_is_retried_text_only_over_http() {
    let (base_url, seen) = start_server().await;
    let backend = OpenAiClient::new(&service(base_url), Some("sk-test".to_string())).unwrap();
    let client = ClassificationClient::new(backend);

    let raw = client.classify(&request_with_media()).await.unwrap();
    assert!(raw.contains("\"assunto\":\"Atraso\""));

    let bodies = seen.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 2);
    assert!(has_image_part(&bodies[0]));
    assert_eq!(
        bodies[0]["messages"][1]["content"][0]["text"],
        "1 - Meu pedido está atrasado\n\nO cliente também enviou 1 imagem(ns), anexada(s) a esta mensagem."
    );
    assert!(!has_image_part(&bodies[1]));
    assert_eq!(bodies[1]["model"], "test-model");
    assert_eq!(bodies[1]["messages"][0]["role"], "system");
    assert_eq!(bodies[1]["messages"][1]["content"], "1 - Meu pedido está atrasado");
}

#[tokio::test]
async fn text_only_request_is_sent_once() {
    let (base_url, seen) = start_server().await;
    let backend = OpenAiClient::new(&service(base_url), None).unwrap();
    let client = ClassificationClient::new(backend);

    client.classify(&request_with_media().text_only()).await.unwrap();
    assert_eq!(seen.bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_service_is_a_hard_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local_addr").port()
    };
    let backend = OpenAiClient::new(&service(format!("http://127.0.0.1:{}/v1", port)), None).unwrap();
    let client = ClassificationClient::new(backend);
    let err = client.classify(&request_with_media()).await.unwrap_err();
    assert!(matches!(err, LlmError::Request(_)));
}
