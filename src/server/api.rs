//! JSON API handlers mounted under `/api`

use super::{ApiError, AppState};
use crate::chat::{Exchange, PersonalityInfo};
use crate::memory::{ConversationTurn, MemorySearchResult, TurnId};
use axum::{
    extract::{Extension, Query},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_RECENT_LIMIT: usize = 10;

pub fn router() -> Router {
    Router::new()
        .route("/send_message", post(send_message))
        .route("/get_conversation_history", get(conversation_history))
        .route("/clear_conversation", post(clear_conversation))
        .route("/memory/facts", get(memory_facts))
        .route("/memory/search", get(memory_search))
        .route("/memory/recent", get(memory_recent))
        .route("/preferences", get(list_preferences).put(put_preference))
        .route("/personality", get(personality))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub response: String,
    pub session_id: Uuid,
    pub turn_id: TurnId,
    /// Always null: speech synthesis is not available
    pub audio_url: Option<String>,
}

async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("No message provided"));
    }

    let (session_id, handle) = state.sessions.open(req.session_id);
    let mut session = handle.lock().await;
    let reply = state.assistant.respond(&mut session, &req.message).await?;

    Ok(Json(SendMessageResponse {
        response: reply.text,
        session_id,
        turn_id: reply.turn_id,
        audio_url: None,
    }))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Exchange>,
    pub count: usize,
}

async fn conversation_history(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Json<HistoryResponse> {
    let history = match query.session_id {
        Some(id) => state.sessions.history(id).await,
        None => Vec::new(),
    };
    Json(HistoryResponse {
        count: history.len(),
        history,
    })
}

#[derive(Debug, Deserialize)]
struct ClearRequest {
    #[serde(default)]
    session_id: Option<Uuid>,
}

async fn clear_conversation(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<ClearRequest>,
) -> Json<serde_json::Value> {
    if let Some(id) = req.session_id {
        if state.sessions.remove(id) {
            info!(session_id = %id, "Conversation cleared");
        }
    }
    Json(serde_json::json!({ "status": "cleared" }))
}

async fn memory_facts(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<BTreeMap<String, BTreeMap<String, String>>> {
    Json(state.assistant.memory().facts_by_category())
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn memory_search(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<MemorySearchResult>, ApiError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing query parameter 'q'"))?;
    Ok(Json(state.assistant.memory().search(&q)))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

async fn memory_recent(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<ConversationTurn>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.assistant.memory().recent_turns(limit))
}

async fn list_preferences(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<BTreeMap<String, String>> {
    Json(state.assistant.memory().preferences())
}

#[derive(Debug, Deserialize)]
struct PreferenceRequest {
    key: String,
    value: String,
}

async fn put_preference(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<PreferenceRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = req.key.trim();
    if key.is_empty() {
        return Err(ApiError::bad_request("Preference key must not be empty"));
    }
    if !state.assistant.memory().remember_preference(key, &req.value) {
        return Err(ApiError::internal("Failed to save preference"));
    }
    Ok(Json(serde_json::json!({
        "status": "saved",
        "key": key,
        "value": req.value,
    })))
}

async fn personality(Extension(state): Extension<Arc<AppState>>) -> Json<PersonalityInfo> {
    Json(state.assistant.personality_info())
}
