//! Web UI: a single chat page plus the JSON endpoints it calls.
//!
//! Chat history lives in process memory, keyed by a session id the page
//! obtains from `POST /api/session`. Long-term memory goes through the
//! [`MemoryStore`] selected at startup.

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::chat::{ChatOrchestrator, ChatSession};
use crate::config::MemchatConfig;
use crate::health::{check_connections, ConnectionReport};
use crate::llm::{ChatClient, ChatMessage};
use crate::memory::{BackendKind, MemoryStore};

const INDEX_HTML: &str = include_str!("ui.html");

/// Sessions untouched for this long are dropped when a new one is created.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// One browser tab's conversation. Turns on the same session hold the inner
/// lock for the whole model call, so they run one after another.
struct SessionEntry {
    session: Arc<tokio::sync::Mutex<ChatSession>>,
    last_used: Instant,
}

pub struct AppState {
    orchestrator: ChatOrchestrator,
    default_user: String,
    session_ttl: Duration,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(orchestrator: ChatOrchestrator, default_user: impl Into<String>) -> Self {
        Self {
            orchestrator,
            default_user: default_user.into(),
            session_ttl: DEFAULT_SESSION_TTL,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a session and mark it used.
    fn session(&self, id: Uuid) -> Result<Arc<tokio::sync::Mutex<ChatSession>>, ApiError> {
        let mut sessions = self.sessions();
        let entry = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        entry.last_used = Instant::now();
        Ok(Arc::clone(&entry.session))
    }

    /// Register a new session, dropping idle ones that have no turn in flight.
    fn create_session(&self, id: Uuid, session: ChatSession) -> usize {
        let now = Instant::now();
        let ttl = self.session_ttl;
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, entry| {
            now.duration_since(entry.last_used) < ttl || entry.session.try_lock().is_err()
        });
        let evicted = before - sessions.len();
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                last_used: now,
            },
        );
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    fn user_or_default(&self, user_id: Option<String>) -> String {
        user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.default_user.clone())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unknown session: {0}")]
    SessionNotFound(Uuid),

    #[error("{0}")]
    Upstream(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };
        let body = ErrorResponse {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user_id: String,
    pub backend: BackendKind,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub memories: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub user_id: String,
    pub backend: BackendKind,
    pub cleared: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/session", post(create_session))
        .route("/api/history", get(history))
        .route("/api/chat", post(chat))
        .route("/api/memory/clear", post(clear_memory))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn create_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let session_id = Uuid::now_v7();
    let user_id = state.default_user.clone();
    let evicted = state.create_session(session_id, ChatSession::new(user_id.clone()));
    tracing::info!(%session_id, evicted, "session created");

    Json(SessionResponse {
        session_id,
        user_id,
        backend: state.orchestrator.memory().backend(),
    })
}

async fn history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(query) = query?;
    let session = state.session(query.session_id)?;
    let messages = session.lock().await.history.clone();
    Ok(Json(HistoryResponse { messages }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let session = state.session(req.session_id)?;
    let mut session = session.lock().await;
    session.user_id = state.user_or_default(req.user_id);

    let turn = state
        .orchestrator
        .respond(&mut session, &req.message)
        .await
        .map_err(|e| {
            tracing::error!(session_id = %req.session_id, error = %format!("{e:#}"), "chat turn failed");
            ApiError::Upstream(format!("{e:#}"))
        })?;

    Ok(Json(ChatResponse {
        reply: turn.reply,
        memories: turn.memories,
        messages: session.history.clone(),
    }))
}

async fn clear_memory(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ClearResponse>, ApiError> {
    // The body is optional; an empty request clears the default user.
    let req: ClearRequest = if body.is_empty() {
        ClearRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let user_id = state.user_or_default(req.user_id);
    let memory = state.orchestrator.memory();

    memory
        .clear(&user_id)
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;
    tracing::info!(user_id = %user_id, backend = %memory.backend(), "memory cleared");

    Ok(Json(ClearResponse {
        user_id,
        backend: memory.backend(),
        cleared: true,
    }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<ConnectionReport> {
    let orchestrator = &state.orchestrator;
    Json(check_connections(orchestrator.memory(), orchestrator.llm()).await)
}

/// Build shared state from config: select the memory backend and the model client.
pub async fn build_state(config: &MemchatConfig) -> Result<Arc<AppState>> {
    let memory = Arc::new(MemoryStore::connect(config).await);
    let llm = Arc::new(ChatClient::new(&config.llm)?);
    if config.llm.api_key.is_none() {
        tracing::warn!("GROQ_API_KEY not set; chat requests will fail until it is configured");
    }
    let orchestrator = ChatOrchestrator::new(memory, llm);
    let state = AppState::new(orchestrator, config.storage.default_user.clone())
        .with_session_ttl(Duration::from_secs(config.server.session_idle_secs));
    Ok(Arc::new(state))
}

/// Start the web UI.
pub async fn serve(config: MemchatConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(&config).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "chat UI listening at http://{bind_addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down chat UI");
        })
        .await?;

    Ok(())
}
