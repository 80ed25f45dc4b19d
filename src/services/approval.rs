//! Review, correction, approval and client signature of a response.
//!
//! ```text
//! pendiente -> en_revision -> aprobado -> publicado
//!                   ^             |
//!                   +-- revert ---+
//! ```
//!
//! Guards run before any write. Uniqueness of approved documents and
//! client signatures per response is also enforced by the store.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::notify::{dispatch, Notification, NotificationKind, Notifier};
use super::uploads::{Upload, UploadPolicy};
use super::{not_found_as, ServiceError, ServiceResult};
use crate::database::{patch, DatabaseError, Filter, Repository};
use crate::models::{ApprovedDocument, ClientSignature, FormResponse, ResponseStatus};

#[derive(Clone)]
pub struct ApprovalService {
    responses: Repository<FormResponse>,
    approved: Repository<ApprovedDocument>,
    signatures: Repository<ClientSignature>,
    pdf_policy: UploadPolicy,
    notifier: Arc<dyn Notifier>,
}

impl ApprovalService {
    pub fn new(
        responses: Repository<FormResponse>,
        approved: Repository<ApprovedDocument>,
        signatures: Repository<ClientSignature>,
        pdf_policy: UploadPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            responses,
            approved,
            signatures,
            pdf_policy,
            notifier,
        }
    }

    async fn response(&self, response_id: &str) -> ServiceResult<FormResponse> {
        self.responses
            .select_404(Filter::by_id(response_id))
            .await
            .map_err(not_found_as("Response not found"))
    }

    /// Attach (or replace) the correction PDF on a non-terminal response.
    pub async fn attach_correction(&self, response_id: &str, upload: Upload) -> ServiceResult<FormResponse> {
        self.pdf_policy.check(&upload)?;
        let mut response = self.response(response_id).await?;
        if response.status.is_terminal() {
            return Err(ServiceError::precondition("Published responses cannot be corrected"));
        }

        let correction = upload.into_blob();
        let now = Utc::now();
        self.responses
            .update(
                Filter::by_id(response_id),
                patch(json!({"correction": correction, "updated_at": now})),
            )
            .await?;
        info!("Attached {} byte correction to response {}", correction.size, response_id);

        dispatch(
            &self.notifier,
            Notification::new(NotificationKind::CorrectionAttached, response_id, "Corrección adjuntada"),
        );

        response.correction = Some(correction);
        response.updated_at = now;
        Ok(response)
    }

    /// Approve using the attached correction, or `upload` attached first.
    /// Creates exactly one approved-document snapshot. When the snapshot
    /// insert loses a race, an inline upload is rolled back to the
    /// previous correction.
    pub async fn approve(
        &self,
        response_id: &str,
        approver: &str,
        upload: Option<Upload>,
    ) -> ServiceResult<ApprovedDocument> {
        if let Some(upload) = &upload {
            self.pdf_policy.check(upload)?;
        }
        let existing = self.response(response_id).await?;
        match existing.status {
            ResponseStatus::Aprobado => return Err(ServiceError::precondition("Response is already approved")),
            ResponseStatus::Publicado => return Err(ServiceError::precondition("Response is already published")),
            _ => {}
        }
        if upload.is_none() && !existing.has_correction() {
            return Err(ServiceError::precondition(
                "A correction file is required before approving",
            ));
        }
        if self.approved.count(Filter::all().eq("response_id", response_id)).await? > 0 {
            return Err(ServiceError::precondition("Response is already approved"));
        }

        let previous = existing.correction.clone();
        let inline = upload.is_some();
        let response = match upload {
            Some(upload) => self.attach_correction(response_id, upload).await?,
            None => existing,
        };
        let Some(correction) = response.correction.clone() else {
            return Err(ServiceError::precondition("A correction file is required before approving"));
        };

        let now = Utc::now();
        let snapshot = ApprovedDocument::snapshot(&response, correction, approver, now);
        match self.approved.insert(&snapshot).await {
            Ok(_) => {}
            Err(DatabaseError::Duplicate(_)) => {
                if inline {
                    self.responses
                        .update(
                            Filter::by_id(response_id),
                            patch(json!({"correction": previous, "updated_at": Utc::now()})),
                        )
                        .await?;
                }
                return Err(ServiceError::precondition("Response is already approved"));
            }
            Err(e) => return Err(e.into()),
        }

        self.responses
            .update(
                Filter::by_id(response_id),
                patch(json!({
                    "status": ResponseStatus::Aprobado,
                    "approved_at": now,
                    "approved_by": approver,
                    "updated_at": now,
                })),
            )
            .await?;
        info!("Response {} approved by {}", response_id, approver);

        dispatch(
            &self.notifier,
            Notification::new(
                NotificationKind::ResponseApproved,
                response_id,
                format!("\"{}\" fue aprobado", response.form_title),
            ),
        );
        Ok(snapshot)
    }

    /// Revert: drop the approved document (if any) and the correction, and
    /// return the response to `en_revision`. Safe to repeat.
    pub async fn remove_correction(&self, response_id: &str) -> ServiceResult<FormResponse> {
        let mut response = self.response(response_id).await?;
        if response.status.is_terminal() {
            return Err(ServiceError::precondition("Published responses cannot be reverted"));
        }

        let removed = self
            .approved
            .delete_many(Filter::all().eq("response_id", response_id))
            .await?;

        let now = Utc::now();
        self.responses
            .update(
                Filter::by_id(response_id),
                patch(json!({
                    "status": ResponseStatus::EnRevision,
                    "correction": Value::Null,
                    "approved_at": Value::Null,
                    "approved_by": Value::Null,
                    "updated_at": now,
                })),
            )
            .await?;
        info!(
            "Reverted response {} to en_revision ({} approved document(s) removed)",
            response_id, removed
        );

        response.status = ResponseStatus::EnRevision;
        response.correction = None;
        response.approved_at = None;
        response.approved_by = None;
        response.updated_at = now;
        Ok(response)
    }

    pub async fn approved_document(&self, response_id: &str) -> ServiceResult<ApprovedDocument> {
        self.approved
            .select_404(Filter::all().eq("response_id", response_id))
            .await
            .map_err(not_found_as("No approved document for this response"))
    }

    /// Record the client's signed copy. Only approved responses, at most once.
    pub async fn sign(&self, response_id: &str, uploaded_by: &str, upload: Upload) -> ServiceResult<ClientSignature> {
        self.pdf_policy.check(&upload)?;
        let response = self.response(response_id).await?;
        if response.status != ResponseStatus::Aprobado {
            return Err(ServiceError::precondition(format!(
                "Client signature requires an approved response (status is {})",
                response.status
            )));
        }
        let duplicate = || ServiceError::precondition("A client signature already exists for this response");
        if self
            .signatures
            .count(Filter::all().eq("response_id", response_id))
            .await?
            > 0
        {
            return Err(duplicate());
        }

        let signature = ClientSignature {
            id: Uuid::new_v4().to_string(),
            response_id: response_id.to_string(),
            file: upload.into_blob(),
            uploaded_by: uploaded_by.to_string(),
            signed_at: Utc::now(),
            form_title: response.form_title.clone(),
            company: response.submitter.company.clone(),
        };
        // the unique index closes the window between count and insert
        match self.signatures.insert(&signature).await {
            Ok(_) => {}
            Err(DatabaseError::Duplicate(_)) => return Err(duplicate()),
            Err(e) => return Err(e.into()),
        }
        info!("Client signature stored for response {}", response_id);

        dispatch(
            &self.notifier,
            Notification::new(NotificationKind::SignatureUploaded, response_id, "Firma del cliente recibida"),
        );
        Ok(signature)
    }

    pub async fn signature(&self, response_id: &str) -> ServiceResult<ClientSignature> {
        self.signatures
            .select_404(Filter::all().eq("response_id", response_id))
            .await
            .map_err(not_found_as("No client signature for this response"))
    }

    /// Override path to the terminal state. Publishing twice is a no-op.
    pub async fn publish(&self, response_id: &str, published_by: &str) -> ServiceResult<FormResponse> {
        let mut response = self.response(response_id).await?;
        if response.status.is_terminal() {
            return Ok(response);
        }

        let now = Utc::now();
        self.responses
            .update(
                Filter::by_id(response_id),
                patch(json!({
                    "status": ResponseStatus::Publicado,
                    "published_at": now,
                    "updated_at": now,
                })),
            )
            .await?;
        info!("Response {} published by {} (was {})", response_id, published_by, response.status);

        dispatch(
            &self.notifier,
            Notification::new(NotificationKind::ResponsePublished, response_id, "Documento publicado"),
        );

        response.status = ResponseStatus::Publicado;
        response.published_at = Some(now);
        response.updated_at = now;
        Ok(response)
    }
}
