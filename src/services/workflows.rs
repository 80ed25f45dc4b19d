use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{not_found_as, ServiceError, ServiceResult};
use crate::crypto::{CryptoVault, SealedField, WorkflowCrypto};
use crate::database::{patch, ElementMatch, Filter, Repository};
use crate::models::{TaskNode, WorkflowDocument};

/// Client-supplied workflow body for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowInput {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "management-category", default)]
    pub management_category: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<TaskNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update of one task node. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    pub scanned: usize,
    pub encrypted: usize,
    pub skipped: usize,
    /// Ids that could not be migrated.
    pub failed: Vec<String>,
}

/// Workflow CRUD with transparent field encryption.
#[derive(Clone)]
pub struct WorkflowService {
    workflows: Repository<WorkflowDocument>,
    crypto: WorkflowCrypto,
}

impl WorkflowService {
    pub fn new(workflows: Repository<WorkflowDocument>, crypto: WorkflowCrypto) -> Self {
        Self { workflows, crypto }
    }

    pub fn repository(&self) -> &Repository<WorkflowDocument> {
        &self.workflows
    }

    pub async fn create(&self, input: WorkflowInput) -> ServiceResult<WorkflowDocument> {
        let now = Utc::now();
        let doc = build(Uuid::new_v4().to_string(), input, Some(now), None)?;
        let sealed = self.crypto.encrypt_workflow(&doc)?;
        self.workflows.insert(&sealed).await?;
        info!("Created workflow {} with {} node(s)", doc.id, doc.nodes.len());
        Ok(doc)
    }

    pub async fn list(&self) -> ServiceResult<Vec<WorkflowDocument>> {
        let stored = self.workflows.select_any(Filter::all()).await?;
        Ok(stored.iter().map(|w| self.crypto.decrypt_workflow(w)).collect())
    }

    pub async fn get(&self, id: &str) -> ServiceResult<WorkflowDocument> {
        let stored = self.load(id).await?;
        Ok(self.crypto.decrypt_workflow(&stored))
    }

    /// Full replacement. Values holding the decryption-failure marker are
    /// refused so a bad read can never overwrite real data.
    pub async fn update(&self, id: &str, input: WorkflowInput) -> ServiceResult<WorkflowDocument> {
        let existing = self.load(id).await?;
        let mut doc = build(id.to_string(), input, existing.created_at, Some(Utc::now()))?;
        doc.migration_note = existing.migration_note;

        let sealed = self.crypto.encrypt_workflow(&doc)?;
        self.workflows.replace(Filter::by_id(id), &sealed).await?;
        info!("Updated workflow {}", id);
        Ok(doc)
    }

    /// Patch one node in place; sensitive fields are re-encrypted.
    pub async fn update_node(&self, id: &str, node_id: &str, changes: NodePatch) -> ServiceResult<WorkflowDocument> {
        let vault = self.crypto.vault();
        let mut fields = Map::new();

        let sensitive = [
            ("title", changes.title),
            ("description", changes.description),
            ("type", changes.node_type),
            ("priority", changes.priority),
            ("assignedTo", changes.assigned_to),
        ];
        for (key, value) in sensitive {
            if let Some(value) = value {
                refuse_sentinel(key, &value)?;
                fields.insert(key.to_string(), Value::String(vault.seal(&value)?));
            }
        }
        if let Some(status) = changes.status {
            fields.insert("status".to_string(), Value::String(status));
        }
        if let Some(department) = changes.department {
            fields.insert("department".to_string(), Value::String(department));
        }
        if let Some(due) = changes.due_date {
            fields.insert("due_date".to_string(), json!(due));
        }
        if let Some(done) = changes.completed_at {
            fields.insert("completed_at".to_string(), json!(done));
        }
        if fields.is_empty() {
            return Err(ServiceError::validation("No node fields to update"));
        }

        let touched = self
            .workflows
            .update_elements(Filter::by_id(id), "nodes", ElementMatch::by("id", node_id), fields)
            .await?;
        if touched == 0 {
            self.load(id).await?;
            return Err(ServiceError::not_found(format!("Node '{}' not found in workflow", node_id)));
        }
        self.workflows
            .update(Filter::by_id(id), patch(json!({"updated_at": Utc::now()})))
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        if self.workflows.delete(Filter::by_id(id)).await? == 0 {
            return Err(ServiceError::not_found("Workflow not found"));
        }
        info!("Deleted workflow {}", id);
        Ok(())
    }

    /// Encrypt every workflow still stored in plaintext.
    ///
    /// Records whose discriminator already contains the ciphertext separator
    /// are skipped, which is what makes re-running safe. Each migrated record
    /// is tagged with a note carrying the migration time.
    pub async fn migrate(&self) -> ServiceResult<MigrationReport> {
        let stored = self.workflows.select_any(Filter::all()).await?;
        let mut report = MigrationReport {
            scanned: stored.len(),
            ..MigrationReport::default()
        };

        for doc in stored {
            let already = discriminator(&doc)
                .map(|value| SealedField::classify_legacy(value).is_encrypted())
                .unwrap_or(true);
            if already {
                report.skipped += 1;
                continue;
            }

            let mut sealed = match self.crypto.encrypt_workflow(&doc) {
                Ok(sealed) => sealed,
                Err(e) => {
                    error!("Failed to encrypt workflow {}: {}", doc.id, e);
                    report.failed.push(doc.id);
                    continue;
                }
            };
            sealed.migration_note = Some(format!("Encrypted by migration at {}", Utc::now().to_rfc3339()));

            match self.workflows.replace(Filter::by_id(doc.id.as_str()), &sealed).await {
                Ok(_) => report.encrypted += 1,
                Err(e) => {
                    error!("Failed to store migrated workflow {}: {}", doc.id, e);
                    report.failed.push(doc.id);
                }
            }
        }

        if report.failed.is_empty() {
            info!(
                "Workflow migration: {} scanned, {} encrypted, {} skipped",
                report.scanned, report.encrypted, report.skipped
            );
        } else {
            warn!(
                "Workflow migration finished with {} failure(s): {:?}",
                report.failed.len(),
                report.failed
            );
        }
        Ok(report)
    }

    async fn load(&self, id: &str) -> ServiceResult<WorkflowDocument> {
        self.workflows
            .select_404(Filter::by_id(id))
            .await
            .map_err(not_found_as("Workflow not found"))
    }
}

/// First non-empty sensitive value, `name` preferred.
fn discriminator(doc: &WorkflowDocument) -> Option<&str> {
    [&doc.name, &doc.status, &doc.management_category, &doc.company]
        .into_iter()
        .chain(doc.nodes.iter().flat_map(|n| {
            [&n.title, &n.description, &n.node_type, &n.priority, &n.assigned_to]
        }))
        .map(String::as_str)
        .find(|v| !v.is_empty())
}

fn refuse_sentinel(field: &str, value: &str) -> ServiceResult<()> {
    if CryptoVault::is_decryption_failure(value) {
        return Err(ServiceError::validation(format!(
            "Field '{}' holds an undecryptable value and cannot be saved",
            field
        )));
    }
    Ok(())
}

fn build(
    id: String,
    input: WorkflowInput,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
) -> ServiceResult<WorkflowDocument> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("Workflow name is required"));
    }
    let nodes = input
        .nodes
        .into_iter()
        .map(|mut node| {
            if node.id.trim().is_empty() {
                node.id = Uuid::new_v4().to_string();
            }
            node
        })
        .collect();

    let doc = WorkflowDocument {
        id,
        name: input.name,
        status: input.status,
        management_category: input.management_category,
        company: input.company,
        company_id: input.company_id,
        nodes,
        created_at,
        updated_at,
        migration_note: None,
        extra: input.extra,
    };

    let failed = WorkflowCrypto::failed_fields(&doc);
    if !failed.is_empty() {
        return Err(ServiceError::validation(format!(
            "Undecryptable values cannot be saved: {}",
            failed.join(", ")
        )));
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{is_ciphertext, DECRYPTION_FAILED};
    use crate::database::MemoryCollection;
    use std::sync::Arc;

    fn service() -> WorkflowService {
        WorkflowService::new(
            Repository::new(Arc::new(MemoryCollection::new("workflows"))),
            WorkflowCrypto::new(CryptoVault::new([5u8; 32])),
        )
    }

    fn input(name: &str) -> WorkflowInput {
        serde_json::from_value(json!({
            "name": name,
            "status": "activo",
            "management-category": "Personas",
            "company": "ACME",
            "nodes": [
                {"id": "n1", "title": "Revisar", "type": "task", "priority": "alta", "assignedTo": "ana"},
                {"title": "Firmar"}
            ],
            "owner_note": "extra"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn crud_stores_ciphertext_and_returns_plaintext() {
        let svc = service();
        let created = svc.create(input("Onboarding")).await.unwrap();
        assert_eq!(created.nodes[0].id, "n1");
        assert!(!created.nodes[1].id.is_empty());

        let raw = svc.workflows.select_404(Filter::by_id(created.id.as_str())).await.unwrap();
        assert!(is_ciphertext(&raw.name));
        assert!(is_ciphertext(&raw.nodes[0].assigned_to));
        assert_eq!(raw.extra["owner_note"], "extra");

        let fetched = svc.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);

        let updated = svc.update(&created.id, input("Offboarding")).await.unwrap();
        assert_eq!(svc.get(&created.id).await.unwrap().name, "Offboarding");
        assert_eq!(updated.created_at, created.created_at);

        svc.delete(&created.id).await.unwrap();
        assert!(matches!(svc.get(&created.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(&created.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_node_reencrypts_sensitive_fields() {
        let svc = service();
        let created = svc.create(input("Onboarding")).await.unwrap();

        let changes = NodePatch {
            title: Some("Revisar contrato".into()),
            status: Some("hecho".into()),
            ..NodePatch::default()
        };
        let after = svc.update_node(&created.id, "n1", changes).await.unwrap();
        assert_eq!(after.nodes[0].title, "Revisar contrato");
        assert_eq!(after.nodes[0].status.as_deref(), Some("hecho"));
        assert_eq!(after.nodes[1].title, "Firmar");

        let raw = svc.workflows.select_404(Filter::by_id(created.id.as_str())).await.unwrap();
        assert!(is_ciphertext(&raw.nodes[0].title));

        let err = svc
            .update_node(&created.id, "n9", NodePatch { title: Some("x".into()), ..NodePatch::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = svc.update_node(&created.id, "n1", NodePatch::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn sentinel_values_are_refused() {
        let svc = service();
        let created = svc.create(input("Onboarding")).await.unwrap();

        let err = svc.update(&created.id, input(DECRYPTION_FAILED)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = svc
            .update_node(
                &created.id,
                "n1",
                NodePatch { description: Some(DECRYPTION_FAILED.into()), ..NodePatch::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(svc.get(&created.id).await.unwrap().name, "Onboarding");
    }
}
