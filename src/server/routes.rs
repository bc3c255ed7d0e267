//! Axum route handlers for the critterchat HTTP server.
//!
//! # Routes
//!
//! - `POST   /chat`          - Chat with a persona (`cat`, `goldfish`, `sloth`)
//! - `GET    /health`        - Returns status, model readiness and version
//! - `GET    /sessions`      - Number of live goldfish sessions and the cap
//! - `DELETE /sessions/:id`  - Forget one session

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::{ChatReply, ChatRequest, Dispatcher};
use crate::streaming::CharStream;
use crate::utilities::errors::ChatError;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Persona dispatcher, shared by every request.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/sessions", get(sessions_handler))
        .route("/sessions/:id", delete(forget_session_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// POST /chat - complete replies as JSON, sloth replies as a slow text stream.
///
/// Body rejections are answered in the same `{"error": ...}` shape as
/// every other client error.
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ChatError> {
    let Json(request) =
        payload.map_err(|rejection| ChatError::InvalidBody(rejection.body_text()))?;
    tracing::debug!(
        model = %request.model,
        session = %request.session_key(),
        "chat request"
    );

    match state.dispatcher.dispatch(request).await? {
        ChatReply::Complete(text) => {
            Ok(Json(serde_json::json!({ "response": text })).into_response())
        }
        ChatReply::Stream(stream) => Ok(stream_response(stream)),
    }
}

/// Wrap a character stream as a chunked `text/plain` body.
///
/// When the client disconnects axum drops the body, which drops the stream
/// and cancels the emitter.
fn stream_response(stream: CharStream) -> Response {
    let chunks = stream.map(|token| Ok::<_, Infallible>(Bytes::from(token.ch.to_string())));
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response()
}

/// GET /health - liveness and readiness check.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "models_loaded": state.dispatcher.models_loaded(),
        "version": crate::VERSION,
        "service": "critterchat",
    }))
}

/// GET /sessions - live session count against the reaper cap.
async fn sessions_handler(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "sessions": state.dispatcher.store().len(),
        "max_sessions": state.dispatcher.config().reaper.max_sessions,
    }))
}

/// DELETE /sessions/:id - full amnesia on demand.
async fn forget_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Value> {
    let forgotten = state.dispatcher.store().forget(&id).await;
    if forgotten {
        tracing::info!(session = %id, "session forgotten");
    }
    Json(serde_json::json!({ "forgotten": forgotten }))
}
