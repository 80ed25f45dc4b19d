use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Section tag of forms whose responses produce a contract amendment.
pub const ANEXOS_SECTION: &str = "Anexos";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    /// Category discriminator; selects the document generation path.
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Form {
    pub fn produces_amendment(&self) -> bool {
        self.section.as_deref() == Some(ANEXOS_SECTION)
    }
}
