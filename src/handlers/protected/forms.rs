// handlers/protected/forms.rs - Form definitions

use axum::{extract::State, Json};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Form;
use crate::services::NewForm;

/// POST /api/forms - Create a form definition
///
/// Responses to a form in the `Anexos` section produce a DOCX contract
/// amendment; every other form produces a plain text transcript.
///
/// ```json
/// { "title": "Anexo de contrato", "section": "Anexos" }
/// ```
pub async fn create(State(state): State<AppState>, Json(payload): Json<NewForm>) -> ApiResult<Form> {
    let form = state.submissions.create_form(payload).await?;
    Ok(ApiResponse::created(form))
}

/// GET /api/forms - List form definitions
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Form>> {
    Ok(ApiResponse::success(state.submissions.list_forms().await?))
}
