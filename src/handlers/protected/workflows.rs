// handlers/protected/workflows.rs - Workflow CRUD with encrypted task fields
//
// Documents go out decrypted; a field that cannot be decrypted shows the
// "[Error al desencriptar]" marker and is refused if sent back.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::WorkflowDocument;
use crate::services::{MigrationReport, NodePatch, WorkflowInput};

/// POST /api/workflows
///
/// ```json
/// {
///   "name": "Onboarding Juan Pérez",
///   "management-category": "Contratación",
///   "company": "ACME",
///   "nodes": [{ "id": "n1", "title": "Firmar contrato", "assignedTo": "Ana" }]
/// }
/// ```
pub async fn create(State(state): State<AppState>, Json(payload): Json<WorkflowInput>) -> ApiResult<WorkflowDocument> {
    Ok(ApiResponse::created(state.workflows.create(payload).await?))
}

/// GET /api/workflows
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<WorkflowDocument>> {
    Ok(ApiResponse::success(state.workflows.list().await?))
}

/// GET /api/workflows/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<WorkflowDocument> {
    Ok(ApiResponse::success(state.workflows.get(&id).await?))
}

/// PUT /api/workflows/:id - Full replacement
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<WorkflowInput>,
) -> ApiResult<WorkflowDocument> {
    Ok(ApiResponse::success(state.workflows.update(&id, payload).await?))
}

/// PATCH /api/workflows/:id/nodes/:node_id - Update a single task node
///
/// ```json
/// { "status": "completed", "completed_at": "2025-01-02T10:00:00Z" }
/// ```
pub async fn update_node(
    State(state): State<AppState>,
    Path((id, node_id)): Path<(String, String)>,
    Json(payload): Json<NodePatch>,
) -> ApiResult<WorkflowDocument> {
    Ok(ApiResponse::success(state.workflows.update_node(&id, &node_id, payload).await?))
}

/// DELETE /api/workflows/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.workflows.delete(&id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/workflows/migrate - Encrypt every workflow still stored in plaintext
///
/// Safe to repeat: already encrypted records are skipped.
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "scanned": 5, "encrypted": 3, "skipped": 2, "failed": [] } }
/// ```
pub async fn migrate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<MigrationReport> {
    info!("Workflow encryption migration requested by {}", user.name);
    let report = state.workflows.migrate().await?;
    Ok(ApiResponse::success(report))
}
