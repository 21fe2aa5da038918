//! REST endpoints for chat sessions.
//!
//! Every response uses the `{success, data?, message?}` envelope.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::controller::{SubmitOutcome, SessionController};
use super::gate::Rejection;
use super::registry::SessionRegistry;

/// Shared state for chat routes.
#[derive(Clone)]
pub struct ChatRouteState {
    pub registry: Arc<SessionRegistry>,
}

/// Response envelope.
#[derive(Debug, Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ApiResponse {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

fn parse_session_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid session ID"))
}

async fn lookup(state: &ChatRouteState, raw: &str) -> Result<Arc<SessionController>, Response> {
    let id = parse_session_id(raw)?;
    state
        .registry
        .get(id)
        .await
        .map_err(|e| error_response(StatusCode::NOT_FOUND, e.to_string()))
}

fn rejection_status(rejection: Rejection) -> StatusCode {
    match rejection {
        Rejection::Empty | Rejection::TooLong => StatusCode::UNPROCESSABLE_ENTITY,
        Rejection::Busy => StatusCode::CONFLICT,
        Rejection::Closed => StatusCode::GONE,
    }
}

fn rejection_message(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::Empty => "Message is empty",
        Rejection::TooLong => "Message is too long",
        Rejection::Busy => "A reply is still pending",
        Rejection::Closed => "Session is closed",
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "career-assist-chat",
    }))
}

/// POST /api/chat/sessions
async fn open_session(State(state): State<ChatRouteState>) -> Response {
    let controller = state.registry.open().await;
    let snapshot = controller.current().await;
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(serde_json::json!({
            "id": controller.id(),
            "messages": snapshot.messages,
        }))),
    )
        .into_response()
}

/// DELETE /api/chat/sessions/{id}
async fn close_session(State(state): State<ChatRouteState>, Path(id): Path<String>) -> Response {
    let id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.registry.close(id).await {
        Ok(()) => Json(ApiResponse::ok(serde_json::json!({ "id": id }))).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

/// GET /api/chat/sessions/{id}/messages
async fn get_history(State(state): State<ChatRouteState>, Path(id): Path<String>) -> Response {
    let controller = match lookup(&state, &id).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let snapshot = controller.current().await;
    Json(ApiResponse::ok(serde_json::json!({
        "total": snapshot.messages.len(),
        "busy": snapshot.busy,
        "messages": snapshot.messages,
    })))
    .into_response()
}

#[derive(Deserialize)]
struct SubmitRequest {
    message: String,
}

/// POST /api/chat/sessions/{id}/messages
///
/// Waits for the reply and returns the messages appended by this submission.
async fn submit_message(
    State(state): State<ChatRouteState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    let controller = match lookup(&state, &id).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    // Run detached so a dropped connection cannot strand the session in `Sending`.
    let task = tokio::spawn(async move { controller.submit(&body.message).await });
    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Submission task failed: {e}"),
            );
        }
    };

    match result {
        Ok(outcome) => {
            let appended: Vec<_> = std::iter::once(outcome.user())
                .chain(outcome.assistant())
                .cloned()
                .collect();
            let failed = matches!(outcome, SubmitOutcome::Failed { .. });
            Json(ApiResponse::ok(serde_json::json!({
                "outcome": outcome.label(),
                "failed": failed,
                "messages": appended,
            })))
            .into_response()
        }
        Err(rejection) => (
            rejection_status(rejection),
            Json(ApiResponse {
                success: false,
                data: Some(serde_json::json!({ "reason": rejection })),
                message: Some(rejection_message(rejection).to_string()),
            }),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    session_id: Option<Uuid>,
    message_id: Option<String>,
    rating: Option<i32>,
    comment: Option<String>,
}

/// POST /api/chat/feedback
///
/// Feedback is logged only.
async fn submit_feedback(Json(body): Json<FeedbackRequest>) -> impl IntoResponse {
    info!(
        session_id = ?body.session_id,
        message_id = ?body.message_id,
        rating = ?body.rating,
        comment = ?body.comment,
        "Chat feedback received"
    );
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some("Feedback submitted successfully".to_string()),
    })
}

/// Build the chat REST routes.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat/sessions", post(open_session))
        .route("/api/chat/sessions/{id}", delete(close_session))
        .route(
            "/api/chat/sessions/{id}/messages",
            get(get_history).post(submit_message),
        )
        .route("/api/chat/feedback", post(submit_feedback))
        .with_state(state)
}
