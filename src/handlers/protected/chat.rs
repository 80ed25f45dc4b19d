// handlers/protected/chat.rs - Per-response message thread

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::ChatMessage;

/// GET /api/responses/:id/messages
pub async fn list(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<ChatMessage>> {
    Ok(ApiResponse::success(state.chat.list(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub text: String,
}

/// POST /api/responses/:id/messages
///
/// ```json
/// { "text": "Falta el RUT del trabajador" }
/// ```
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<PostMessage>,
) -> ApiResult<ChatMessage> {
    let message = state.chat.add_message(&id, &user.name, &payload.text).await?;
    Ok(ApiResponse::created(message))
}

#[derive(Debug, Deserialize)]
pub struct ReadAllQuery {
    pub response_id: Option<String>,
}

/// PUT /api/messages/read-all[?response_id=...]
///
/// Without `response_id` every unread message in every response is marked.
pub async fn read_all(State(state): State<AppState>, Query(query): Query<ReadAllQuery>) -> ApiResult<Value> {
    let updated = state.chat.mark_all_read(query.response_id.as_deref()).await?;
    Ok(ApiResponse::success(json!({ "responses_updated": updated })))
}
