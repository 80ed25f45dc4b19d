// handlers/protected/approval.rs - Correction, approval, publication and client signature

use axum::extract::{Multipart, Path, State};
use axum::Extension;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::download::Attachment;
use crate::handlers::multipart::{read_optional_upload, read_upload};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{ApprovedDocument, ClientSignature, FormResponse};

/// POST /api/responses/:id/correction - Attach the corrected PDF (multipart `file`)
///
/// Replaces any earlier correction. Refused once the response is published.
pub async fn attach_correction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<FormResponse> {
    let upload = read_upload(multipart).await?;
    Ok(ApiResponse::success(state.approval.attach_correction(&id, upload).await?))
}

/// DELETE /api/responses/:id/correction - Revert to `en_revision`
///
/// Drops the correction and any approved snapshot. Safe to repeat.
pub async fn remove_correction(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FormResponse> {
    Ok(ApiResponse::success(state.approval.remove_correction(&id).await?))
}

/// POST /api/responses/:id/approve - Approve using the attached correction
///
/// A multipart `file` may be sent to attach the correction in the same call.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": { "_id": "...", "response_id": "...", "approved_by": "Ana", "approved_at": "..." }
/// }
/// ```
pub async fn approve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    multipart: Option<Multipart>,
) -> ApiResult<ApprovedDocument> {
    let upload = read_optional_upload(multipart).await?;
    let approved = state.approval.approve(&id, &user.name, upload).await?;
    Ok(ApiResponse::created(approved))
}

/// GET /api/responses/:id/approved - Download the approved corrected file
pub async fn approved_download(State(state): State<AppState>, Path(id): Path<String>) -> Result<Attachment, ApiError> {
    let approved = state.approval.approved_document(&id).await?;
    let file = approved.correction;
    Ok(Attachment::new(file.file_name, file.mime_type, file.data))
}

/// POST /api/responses/:id/publish - Move to `publicado` from any state
pub async fn publish(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<FormResponse> {
    Ok(ApiResponse::success(state.approval.publish(&id, &user.name).await?))
}

/// POST /api/responses/:id/signature - Upload the client's signed PDF (multipart `file`)
///
/// Only for approved responses, and only once per response.
pub async fn sign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<ClientSignature> {
    let upload = read_upload(multipart).await?;
    let signature = state.approval.sign(&id, &user.name, upload).await?;
    Ok(ApiResponse::created(signature))
}

/// GET /api/responses/:id/signature - Download the client signature file
pub async fn signature_download(State(state): State<AppState>, Path(id): Path<String>) -> Result<Attachment, ApiError> {
    let signature = state.approval.signature(&id).await?;
    let file = signature.file;
    Ok(Attachment::new(file.file_name, file.mime_type, file.data))
}
