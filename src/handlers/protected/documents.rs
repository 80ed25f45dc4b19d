// handlers/protected/documents.rs - Generated document metadata and download

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::download::Attachment;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::DocumentSummary;

/// GET /api/documents/:generated_id - Metadata only
pub async fn show(State(state): State<AppState>, Path(generated_id): Path<String>) -> ApiResult<DocumentSummary> {
    let doc = state.documents.get_by_generated_id(&generated_id).await?;
    Ok(ApiResponse::success(DocumentSummary::from(&doc)))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// `txt` or anything else for DOCX. Defaults to the stored kind.
    pub kind: Option<String>,
}

/// GET /api/documents/:generated_id/download[?kind=txt|docx]
///
/// Downloading counts as the first review: a `pendiente` response moves
/// to `en_revision`.
pub async fn download(
    State(state): State<AppState>,
    Path(generated_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Attachment, ApiError> {
    let (doc, download) = state
        .documents
        .download(&generated_id, query.kind.as_deref())
        .await?;

    if let Err(e) = state.documents.mark_reviewed(&doc.response_id).await {
        warn!("Could not mark response {} as reviewed: {}", doc.response_id, e);
    }

    Ok(Attachment::new(download.file_name, download.content_type, download.content))
}
