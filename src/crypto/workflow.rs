use crate::models::{TaskNode, WorkflowDocument};

use super::{CryptoError, CryptoVault};

/// Transparent encryption of workflow records around persistence.
#[derive(Debug, Clone)]
pub struct WorkflowCrypto {
    vault: CryptoVault,
}

impl WorkflowCrypto {
    pub fn new(vault: CryptoVault) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &CryptoVault {
        &self.vault
    }

    pub fn encrypt_workflow(&self, doc: &WorkflowDocument) -> Result<WorkflowDocument, CryptoError> {
        let mut out = doc.clone();
        out.name = self.vault.seal(&doc.name)?;
        out.status = self.vault.seal(&doc.status)?;
        out.management_category = self.vault.seal(&doc.management_category)?;
        out.company = self.vault.seal(&doc.company)?;
        out.nodes = doc
            .nodes
            .iter()
            .map(|node| self.encrypt_node(node))
            .collect::<Result<_, _>>()?;
        Ok(out)
    }

    pub fn decrypt_workflow(&self, doc: &WorkflowDocument) -> WorkflowDocument {
        let mut out = doc.clone();
        out.name = self.vault.decrypt(&doc.name);
        out.status = self.vault.decrypt(&doc.status);
        out.management_category = self.vault.decrypt(&doc.management_category);
        out.company = self.vault.decrypt(&doc.company);
        out.nodes = doc.nodes.iter().map(|node| self.decrypt_node(node)).collect();
        out
    }

    pub fn encrypt_node(&self, node: &TaskNode) -> Result<TaskNode, CryptoError> {
        let mut out = node.clone();
        out.title = self.vault.seal(&node.title)?;
        out.description = self.vault.seal(&node.description)?;
        out.node_type = self.vault.seal(&node.node_type)?;
        out.priority = self.vault.seal(&node.priority)?;
        out.assigned_to = self.vault.seal(&node.assigned_to)?;
        Ok(out)
    }

    pub fn decrypt_node(&self, node: &TaskNode) -> TaskNode {
        let mut out = node.clone();
        out.title = self.vault.decrypt(&node.title);
        out.description = self.vault.decrypt(&node.description);
        out.node_type = self.vault.decrypt(&node.node_type);
        out.priority = self.vault.decrypt(&node.priority);
        out.assigned_to = self.vault.decrypt(&node.assigned_to);
        out
    }

    /// Names of the sensitive fields that hold the decryption-failure
    /// sentinel. Such a record must not be written back.
    pub fn failed_fields(doc: &WorkflowDocument) -> Vec<String> {
        let mut failed = Vec::new();
        let top = [
            ("name", &doc.name),
            ("status", &doc.status),
            ("management-category", &doc.management_category),
            ("company", &doc.company),
        ];
        for (field, value) in top {
            if CryptoVault::is_decryption_failure(value) {
                failed.push(field.to_string());
            }
        }
        for node in &doc.nodes {
            let fields = [
                ("title", &node.title),
                ("description", &node.description),
                ("type", &node.node_type),
                ("priority", &node.priority),
                ("assignedTo", &node.assigned_to),
            ];
            for (field, value) in fields {
                if CryptoVault::is_decryption_failure(value) {
                    failed.push(format!("nodes[{}].{}", node.id, field));
                }
            }
        }
        failed
    }
}
