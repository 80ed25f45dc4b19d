//! Application services. Each owns the repositories it needs and is
//! constructed once at startup.

pub mod approval;
pub mod chat;
pub mod companies;
pub mod documents;
pub mod notify;
pub mod submissions;
pub mod tokens;
pub mod uploads;
pub mod users;
pub mod workflows;

use thiserror::Error;

use crate::composer::ComposeError;
use crate::crypto::CryptoError;
use crate::database::DatabaseError;

pub use approval::ApprovalService;
pub use chat::ChatService;
pub use companies::CompanyService;
pub use documents::{DocumentDownload, DocumentStore, DocumentSummary};
pub use notify::{Notification, NotificationKind, Notifier, TracingNotifier};
pub use submissions::{NewForm, NewSubmission, SubmissionOutcome, SubmissionService};
pub use tokens::{Expected, RejectReason, TokenCheck, TokenService};
pub use uploads::{Upload, UploadError, UploadPolicy};
pub use users::{NewUser, UserProfile, UserService};
pub use workflows::{MigrationReport, NodePatch, WorkflowInput, WorkflowService};

/// Typed rejection returned by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    UploadRejected(#[from] UploadError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        ServiceError::PreconditionFailed(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Map a repository 404 onto a domain-specific message.
pub(crate) fn not_found_as(message: &str) -> impl FnOnce(DatabaseError) -> ServiceError + '_ {
    move |err| match err {
        DatabaseError::NotFound(_) => ServiceError::not_found(message),
        other => ServiceError::Database(other),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use serde::{de::DeserializeOwned, Serialize};
    use serde_json::Map;
    use std::sync::Arc;
    use uuid::Uuid;

    use super::*;
    use crate::config::UploadConfig;
    use crate::database::{Backend, Filter, Repository};
    use crate::models::{collections, ApprovedDocument, FormResponse, ResponseStatus, Submitter};

    fn repo<T: Serialize + DeserializeOwned + Send>(backend: &Backend, name: &str) -> Repository<T> {
        Repository::new(backend.collection(name).unwrap())
    }

    /// In-memory services sharing one backend.
    pub struct Fixture {
        pub responses: Repository<FormResponse>,
        pub approved: Repository<ApprovedDocument>,
        pub approval: ApprovalService,
        pub chat: ChatService,
        pub documents: DocumentStore,
    }

    impl Fixture {
        pub fn new() -> Self {
            let backend = Backend::in_memory();
            let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
            let responses: Repository<FormResponse> = repo(&backend, collections::RESPONSES);
            let approved: Repository<ApprovedDocument> = repo(&backend, collections::APPROVED_DOCUMENTS);

            Self {
                approval: ApprovalService::new(
                    responses.clone(),
                    approved.clone(),
                    repo(&backend, collections::CLIENT_SIGNATURES),
                    UploadPolicy::pdf(&UploadConfig::default()),
                    notifier.clone(),
                ),
                chat: ChatService::new(responses.clone(), notifier),
                documents: DocumentStore::new(repo(&backend, collections::GENERATED_DOCUMENTS), responses.clone()),
                responses,
                approved,
            }
        }

        pub async fn response(&self, status: ResponseStatus) -> FormResponse {
            let now = Utc::now();
            let response = FormResponse {
                id: Uuid::new_v4().to_string(),
                form_id: "f1".into(),
                form_title: "Anexo de contrato".into(),
                section: Some("Anexos".into()),
                submitter: Submitter {
                    user_id: "u1".into(),
                    name: "Juan Perez".into(),
                    company: "ACME".into(),
                },
                answers: Map::new(),
                status,
                messages: Vec::new(),
                attachments: Vec::new(),
                correction: None,
                created_at: now,
                updated_at: now,
                reviewed_at: None,
                approved_at: None,
                approved_by: None,
                published_at: None,
            };
            self.responses.insert(&response).await.unwrap();
            response
        }

        pub async fn status(&self, id: &str) -> ResponseStatus {
            self.responses.select_404(Filter::by_id(id)).await.unwrap().status
        }
    }
}
