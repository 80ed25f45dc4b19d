// handlers/protected/responses.rs - Submitting and reading form responses

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{Attachment, FormResponse, ResponseStatus, Submitter};
use crate::services::{DocumentSummary, NewSubmission, SubmissionOutcome};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub form_id: String,
    #[serde(default)]
    pub answers: Map<String, Value>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Only honoured for internal requests, which act on behalf of a user.
    #[serde(default)]
    pub submitter: Option<Submitter>,
}

/// POST /api/responses - Submit answers to a form
///
/// The response is stored first. Document generation is best effort: if it
/// fails the submission still succeeds and `document` is `null`.
///
/// Expected Input:
/// ```json
/// {
///   "form_id": "2b1f...",
///   "answers": { "Nombre del trabajador": "Juan Pérez", "Cargo": "Analista" }
/// }
/// ```
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "response": { "_id": "...", "status": "pendiente", "...": "..." },
///     "document": { "generated_id": "ANEXO_JUAN_PEREZ_1735732800000", "kind": "docx", "size": 8123 }
///   }
/// }
/// ```
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmitRequest>,
) -> ApiResult<SubmissionOutcome> {
    if payload.form_id.trim().is_empty() {
        return Err(ApiError::validation_error("form_id is required", None));
    }

    let submitter = match payload.submitter {
        Some(submitter) if user.internal => submitter,
        _ => Submitter {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            company: user.company.clone(),
        },
    };

    let outcome = state
        .submissions
        .submit(
            NewSubmission {
                form_id: payload.form_id,
                answers: payload.answers,
                attachments: payload.attachments,
            },
            submitter,
        )
        .await?;

    Ok(ApiResponse::created(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ResponseStatus>,
}

/// GET /api/responses[?status=pendiente|en_revision|aprobado|publicado]
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<FormResponse>> {
    Ok(ApiResponse::success(state.submissions.list(query.status).await?))
}

/// GET /api/responses/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FormResponse> {
    Ok(ApiResponse::success(state.submissions.get(&id).await?))
}

/// GET /api/responses/:id/document - Metadata of the latest generated document
pub async fn document(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DocumentSummary> {
    // 404 for the response itself takes precedence
    state.submissions.get(&id).await?;

    let doc = state
        .documents
        .get_by_owner_response_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("No document generated for this response"))?;
    Ok(ApiResponse::success(DocumentSummary::from(&doc)))
}
