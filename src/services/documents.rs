use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::{not_found_as, ServiceResult};
use crate::database::{patch, Filter, Repository};
use crate::models::{DocumentKind, FormResponse, GeneratedDocument, ResponseStatus};

/// Bytes plus the headers a download needs.
#[derive(Debug, Clone)]
pub struct DocumentDownload {
    pub file_name: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

/// Metadata of a generated document, without its content.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub generated_id: String,
    pub response_id: String,
    pub kind: DocumentKind,
    pub size: usize,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<&GeneratedDocument> for DocumentSummary {
    fn from(doc: &GeneratedDocument) -> Self {
        Self {
            generated_id: doc.id.clone(),
            response_id: doc.response_id.clone(),
            kind: doc.kind,
            size: doc.size,
            created_at: doc.created_at,
        }
    }
}

/// Insert-only store of generated documents.
#[derive(Clone)]
pub struct DocumentStore {
    documents: Repository<GeneratedDocument>,
    responses: Repository<FormResponse>,
}

impl DocumentStore {
    pub fn new(documents: Repository<GeneratedDocument>, responses: Repository<FormResponse>) -> Self {
        Self {
            documents,
            responses,
        }
    }

    /// Every call inserts a new record, even for the same response.
    pub async fn store(
        &self,
        kind: DocumentKind,
        content: Vec<u8>,
        owner_response_id: &str,
        generated_id: &str,
    ) -> ServiceResult<GeneratedDocument> {
        let doc = GeneratedDocument {
            id: generated_id.to_string(),
            response_id: owner_response_id.to_string(),
            kind,
            size: content.len(),
            content,
            created_at: Utc::now(),
        };
        self.documents.insert(&doc).await?;
        info!(
            "Stored {} document {} ({} bytes) for response {}",
            kind.extension(),
            doc.id,
            doc.size,
            owner_response_id
        );
        Ok(doc)
    }

    pub async fn get_by_generated_id(&self, generated_id: &str) -> ServiceResult<GeneratedDocument> {
        self.documents
            .select_404(Filter::by_id(generated_id))
            .await
            .map_err(not_found_as("Document not found"))
    }

    /// Most recent document for the response, if any.
    pub async fn get_by_owner_response_id(&self, response_id: &str) -> ServiceResult<Option<GeneratedDocument>> {
        let docs = self
            .documents
            .select_any(Filter::all().eq("response_id", response_id))
            .await?;
        Ok(docs.into_iter().max_by_key(|d| d.created_at))
    }

    /// Content plus headers. `requested_kind` picks content type and
    /// extension through the closed txt/docx mapping; absent, the stored
    /// kind is used.
    pub async fn download(&self, generated_id: &str, requested_kind: Option<&str>) -> ServiceResult<(GeneratedDocument, DocumentDownload)> {
        let doc = self.get_by_generated_id(generated_id).await?;
        let kind = requested_kind
            .map(DocumentKind::from_requested)
            .unwrap_or(doc.kind);
        let download = DocumentDownload {
            file_name: format!("{}.{}", doc.id, kind.extension()),
            content_type: kind.content_type(),
            content: doc.content.clone(),
        };
        Ok((doc, download))
    }

    /// First review of a response: `pendiente` becomes `en_revision` and
    /// the review time is recorded. Later states are left as they are.
    pub async fn mark_reviewed(&self, response_id: &str) -> ServiceResult<FormResponse> {
        let mut response = self
            .responses
            .select_404(Filter::by_id(response_id))
            .await
            .map_err(not_found_as("Response not found"))?;

        if response.status != ResponseStatus::Pendiente {
            debug!("Response {} already past review ({})", response_id, response.status);
            return Ok(response);
        }

        let now = Utc::now();
        self.responses
            .update(
                Filter::by_id(response_id),
                patch(json!({
                    "status": ResponseStatus::EnRevision,
                    "reviewed_at": now,
                    "updated_at": now,
                })),
            )
            .await?;
        info!("Response {} moved to en_revision", response_id);

        response.status = ResponseStatus::EnRevision;
        response.reviewed_at = Some(now);
        response.updated_at = now;
        Ok(response)
    }
}
