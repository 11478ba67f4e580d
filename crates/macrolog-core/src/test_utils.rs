//! Test utilities for macrolog-core
//!
//! A mock LLM provider server speaking the OpenAI chat-completions wire format
//! (also used by Groq) and the Gemini generateContent format.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Classification JSON every mock provider answers with
pub const MOCK_CLASSIFICATION: &str = r#"{"items": [{"category": "meal", "summary": "1 dragon fruit smoothie", "data": {"meal_type": "breakfast", "food": "dragon fruit smoothie", "quantity": 1, "unit": "serving", "calories": 210, "protein_g": 4, "carbs_g": 45, "fat_g": 2, "fiber_g": 5, "sugar_g": 32, "sodium_mg": 40, "confidence": 0.7}}], "needs_clarification": false, "clarification_questions": []}"#;

/// API key the mock server rejects with 401
pub const REJECTED_API_KEY: &str = "bad-key";

/// Model name prefix the mock Gemini endpoint blocks for safety
pub const BLOCKED_MODEL_PREFIX: &str = "blocked";

#[derive(Clone, Default)]
struct ServerState {
    requests: Arc<AtomicUsize>,
}

/// Mock provider server for adapter tests
pub struct MockProviderServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProviderServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = ServerState::default();
        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1beta/models/:model_action", post(handle_generate_content))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, on any route
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockProviderServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
}

/// OpenAI-compatible chat completions endpoint
async fn handle_chat_completions(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let rejected = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", REJECTED_API_KEY));
    if rejected {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}})),
        )
            .into_response();
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": MOCK_CLASSIFICATION},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42}
    }))
    .into_response()
}

/// Gemini generateContent endpoint; the path segment is `{model}:generateContent`
async fn handle_generate_content(
    State(state): State<ServerState>,
    Path(model_action): Path<String>,
    Json(_request): Json<Value>,
) -> Json<Value> {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let model = model_action.split(':').next().unwrap_or_default();
    if model.starts_with(BLOCKED_MODEL_PREFIX) {
        return Json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
    }

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": MOCK_CLASSIFICATION}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 8, "totalTokenCount": 28},
        "modelVersion": model
    }))
}
