use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application user. `name` and `email` are stored encrypted; lookups go
/// through `email_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_index: String,
    pub role: String,
    #[serde(default)]
    pub company: Option<String>,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
