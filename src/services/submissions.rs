use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::companies::CompanyService;
use super::documents::{DocumentStore, DocumentSummary};
use super::notify::{dispatch, Notification, NotificationKind, Notifier};
use super::{not_found_as, ServiceError, ServiceResult};
use crate::composer::{AmendmentFields, AnswerMap, ComposeRequest, DocumentComposer};
use crate::database::{Filter, Repository};
use crate::models::{Attachment, Form, FormResponse, GeneratedDocument, ResponseStatus, Submitter};

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub form_id: String,
    #[serde(default)]
    pub answers: Map<String, Value>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewForm {
    pub title: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub response: FormResponse,
    /// Absent when document generation failed.
    pub document: Option<DocumentSummary>,
}

#[derive(Clone)]
pub struct SubmissionService {
    forms: Repository<Form>,
    responses: Repository<FormResponse>,
    documents: DocumentStore,
    companies: CompanyService,
    notifier: Arc<dyn Notifier>,
    timezone: FixedOffset,
}

impl SubmissionService {
    pub fn new(
        forms: Repository<Form>,
        responses: Repository<FormResponse>,
        documents: DocumentStore,
        companies: CompanyService,
        notifier: Arc<dyn Notifier>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            forms,
            responses,
            documents,
            companies,
            notifier,
            timezone,
        }
    }

    pub async fn create_form(&self, new: NewForm) -> ServiceResult<Form> {
        if new.title.trim().is_empty() {
            return Err(ServiceError::validation("Form title is required"));
        }
        let form = Form {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            section: new.section.filter(|s| !s.trim().is_empty()),
            description: new.description,
            created_at: Utc::now(),
        };
        self.forms.insert(&form).await?;
        Ok(form)
    }

    pub async fn list_forms(&self) -> ServiceResult<Vec<Form>> {
        Ok(self.forms.select_any(Filter::all()).await?)
    }

    /// Store the response, then try to generate its document. A failed
    /// generation is logged and the submission still succeeds.
    pub async fn submit(&self, new: NewSubmission, submitter: Submitter) -> ServiceResult<SubmissionOutcome> {
        let form = self
            .forms
            .select_404(Filter::by_id(new.form_id.as_str()))
            .await
            .map_err(not_found_as("Form not found"))?;

        let now = Utc::now();
        let response = FormResponse {
            id: Uuid::new_v4().to_string(),
            form_id: form.id.clone(),
            form_title: form.title.clone(),
            section: form.section.clone(),
            submitter,
            answers: new.answers,
            status: ResponseStatus::Pendiente,
            messages: Vec::new(),
            attachments: new.attachments,
            correction: None,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
            approved_at: None,
            approved_by: None,
            published_at: None,
        };
        self.responses.insert(&response).await?;
        info!("Stored response {} for form {}", response.id, form.id);

        let document = match self.generate(&response).await {
            Ok(doc) => Some(DocumentSummary::from(&doc)),
            Err(e) => {
                error!("Document generation failed for response {}: {}", response.id, e);
                None
            }
        };

        dispatch(
            &self.notifier,
            Notification::new(
                NotificationKind::ResponseSubmitted,
                response.id.as_str(),
                format!("Nueva respuesta a \"{}\" de {}", form.title, response.submitter.name),
            ),
        );

        Ok(SubmissionOutcome { response, document })
    }

    /// Compose and store a fresh document for `response` under a new id.
    pub async fn generate(&self, response: &FormResponse) -> ServiceResult<GeneratedDocument> {
        let kind = DocumentComposer::kind_for_section(response.section.as_deref());
        let employer = AmendmentFields::employer_name(AnswerMap::new(&response.answers), &response.submitter);
        let letterhead = match employer.filter(|_| kind == crate::models::DocumentKind::Docx) {
            Some(employer) => match self.companies.letterhead_for(&employer).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Letterhead lookup failed, continuing without: {}", e);
                    None
                }
            },
            None => None,
        };

        let composed = DocumentComposer::compose(ComposeRequest {
            response_id: &response.id,
            form_title: &response.form_title,
            section: response.section.as_deref(),
            submitter: &response.submitter,
            answers: &response.answers,
            letterhead,
            now: Utc::now().with_timezone(&self.timezone),
        })?;

        self.documents
            .store(composed.kind, composed.content, &response.id, &composed.generated_id)
            .await
    }

    pub async fn get(&self, response_id: &str) -> ServiceResult<FormResponse> {
        self.responses
            .select_404(Filter::by_id(response_id))
            .await
            .map_err(not_found_as("Response not found"))
    }

    pub async fn list(&self, status: Option<ResponseStatus>) -> ServiceResult<Vec<FormResponse>> {
        let filter = match status {
            Some(status) => Filter::all().eq("status", status.as_str()),
            None => Filter::all(),
        };
        Ok(self.responses.select_any(filter).await?)
    }
}
