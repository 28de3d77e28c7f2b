//! JSON endpoints over the session manager.
//!
//! - `POST   /sessions`               open a session, returns its id
//! - `GET    /sessions/{id}`          current session state
//! - `DELETE /sessions/{id}`          end a session
//! - `POST   /sessions/{id}/messages` send one message, returns the reply
//! - `GET    /health`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::SessionManager;
use crate::domain::{ConversationPhase, Intent, SessionState};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub session_id: String,
    pub reply: String,
    pub intent: Option<Intent>,
    pub phase: ConversationPhase,
    /// False when the turn failed and the session was left unchanged.
    pub committed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
}

#[derive(Clone)]
struct AppState {
    sessions: Arc<SessionManager>,
}

pub fn http_router(sessions: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/messages", post(post_message))
        .with_state(AppState { sessions })
}

/// Serves until Ctrl-C.
pub async fn serve(sessions: Arc<SessionManager>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, http_router(sessions))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        active_sessions: state.sessions.active_sessions().await,
    })
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = state.sessions.start_session().await;
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionState>, StatusCode> {
    state
        .sessions
        .snapshot(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.end_session(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message must not be empty".to_string()));
    }

    let outcome = state.sessions.handle(&id, message).await;
    Ok(Json(MessageResponse {
        session_id: id,
        reply: outcome.reply,
        intent: outcome.intent,
        phase: outcome.phase,
        committed: outcome.committed,
    }))
}
