use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blob::base64_bytes;
use super::{FileBlob, FormResponse};

pub const DOCX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TXT_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Docx,
    Txt,
}

impl DocumentKind {
    /// Closed two-way mapping: `txt` is plain text, anything else is DOCX.
    pub fn from_requested(kind: &str) -> Self {
        if kind.trim().eq_ignore_ascii_case("txt") {
            DocumentKind::Txt
        } else {
            DocumentKind::Docx
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::Txt => TXT_CONTENT_TYPE,
            DocumentKind::Docx => DOCX_CONTENT_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Txt => "txt",
            DocumentKind::Docx => "docx",
        }
    }
}

/// Output of the document composer. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// `ANEXO_<WORKER>_<millis>` or `FORMULARIO_<response>_<millis>`
    #[serde(rename = "_id")]
    pub id: String,
    pub response_id: String,
    pub kind: DocumentKind,
    pub size: usize,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot taken when a response is approved. Later edits to the
/// response do not touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub response_id: String,
    pub correction: FileBlob,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
    pub form_id: String,
    pub form_title: String,
    pub submitter_name: String,
    pub company: String,
    pub submitted_at: DateTime<Utc>,
}

impl ApprovedDocument {
    pub fn snapshot(response: &FormResponse, correction: FileBlob, approved_by: &str, approved_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            response_id: response.id.clone(),
            correction,
            approved_by: approved_by.to_string(),
            approved_at,
            form_id: response.form_id.clone(),
            form_title: response.form_title.clone(),
            submitter_name: response.submitter.name.clone(),
            company: response.submitter.company.clone(),
            submitted_at: response.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSignature {
    #[serde(rename = "_id")]
    pub id: String,
    /// Unique across the collection.
    pub response_id: String,
    pub file: FileBlob,
    pub uploaded_by: String,
    pub signed_at: DateTime<Utc>,
    pub form_title: String,
    pub company: String,
}
