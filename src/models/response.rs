use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::FileBlob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Pendiente,
    EnRevision,
    Aprobado,
    Publicado,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Pendiente => "pendiente",
            ResponseStatus::EnRevision => "en_revision",
            ResponseStatus::Aprobado => "aprobado",
            ResponseStatus::Publicado => "publicado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseStatus::Publicado)
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitter {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: author.into(),
            text: text.into(),
            timestamp: Utc::now(),
            read: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A submitted form instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub form_id: String,
    pub form_title: String,
    #[serde(default)]
    pub section: Option<String>,
    pub submitter: Submitter,
    /// Question text -> answer. Values may be scalars, lists or nested maps.
    pub answers: Map<String, Value>,
    pub status: ResponseStatus,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub correction: Option<FileBlob>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl FormResponse {
    pub fn has_correction(&self) -> bool {
        self.correction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_value(ResponseStatus::EnRevision).unwrap(), "en_revision");
        assert_eq!(serde_json::to_value(ResponseStatus::Pendiente).unwrap(), "pendiente");
        let parsed: ResponseStatus = serde_json::from_value("aprobado".into()).unwrap();
        assert_eq!(parsed, ResponseStatus::Aprobado);
        assert!(ResponseStatus::Publicado.is_terminal());
        assert!(!ResponseStatus::Aprobado.is_terminal());
    }
}
