use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(rename = "_id")]
    pub id: String,
    /// 256-bit random value, hex encoded.
    pub token: String,
    /// Blind index of the owning user's email.
    pub email_index: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}
