use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FileBlob;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rut: Option<String>,
    #[serde(default)]
    pub logo: Option<FileBlob>,
    pub created_at: DateTime<Utc>,
}
