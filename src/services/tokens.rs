use chrono::{DateTime, Duration, FixedOffset, Utc};
use rand::RngCore;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::crypto::CryptoVault;
use crate::database::{patch, Filter, Repository};
use crate::models::SessionToken;

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    Revoked,
    Expired,
    DayMismatch,
    IdentityMismatch,
    RoleMismatch,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotFound => "token not found",
            RejectReason::Revoked => "token revoked",
            RejectReason::Expired => "token expired",
            RejectReason::DayMismatch => "token was issued on a different day",
            RejectReason::IdentityMismatch => "token belongs to another user",
            RejectReason::RoleMismatch => "token role does not match",
        }
    }

    /// Expired and cross-day tokens are removed on sight.
    fn deletes_token(&self) -> bool {
        matches!(self, RejectReason::Expired | RejectReason::DayMismatch)
    }
}

#[derive(Debug, Clone)]
pub enum TokenCheck {
    Valid(SessionToken),
    Rejected(RejectReason),
}

impl TokenCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenCheck::Valid(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            TokenCheck::Valid(_) => "valid",
            TokenCheck::Rejected(reason) => reason.as_str(),
        }
    }
}

/// Optional identity the presented token must belong to.
#[derive(Debug, Default, Clone, Copy)]
pub struct Expected<'a> {
    pub email: Option<&'a str>,
    pub role: Option<&'a str>,
}

/// Session token issuance and validation.
///
/// A token is valid only while active, unexpired and issued on the same
/// calendar day (in `timezone`) as the check.
#[derive(Clone)]
pub struct TokenService {
    tokens: Repository<SessionToken>,
    ttl: Duration,
    timezone: FixedOffset,
}

impl TokenService {
    pub fn new(tokens: Repository<SessionToken>, ttl_minutes: i64, timezone: FixedOffset) -> Self {
        Self {
            tokens,
            ttl: Duration::minutes(ttl_minutes),
            timezone,
        }
    }

    pub fn repository(&self) -> &Repository<SessionToken> {
        &self.tokens
    }

    pub async fn issue(&self, email: &str, role: &str) -> ServiceResult<SessionToken> {
        self.issue_at(email, role, Utc::now()).await
    }

    pub async fn issue_at(&self, email: &str, role: &str, now: DateTime<Utc>) -> ServiceResult<SessionToken> {
        let email_index =
            CryptoVault::blind_index(email).ok_or_else(|| ServiceError::validation("Email is required"))?;

        let active = self
            .tokens
            .select_any(Filter::all().eq("email_index", email_index.as_str()).eq("active", true))
            .await?;

        if let Some(current) = active.iter().find(|t| self.rejection(t, now).is_none()) {
            debug!("Reusing active session token {}", current.id);
            return Ok(current.clone());
        }

        if !active.is_empty() {
            let revoked = self
                .tokens
                .update_many(
                    Filter::all().eq("email_index", email_index.as_str()).eq("active", true),
                    patch(json!({"active": false, "revoked_at": now})),
                )
                .await?;
            debug!("Revoked {} stale session token(s)", revoked);
        }

        let token = SessionToken {
            id: Uuid::new_v4().to_string(),
            token: mint_token(),
            email_index,
            role: role.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
            active: true,
            revoked_at: None,
        };
        self.tokens.insert(&token).await?;
        info!("Issued session token {} (role {})", token.id, token.role);
        Ok(token)
    }

    pub async fn validate(&self, token: &str, expected: Expected<'_>) -> ServiceResult<TokenCheck> {
        self.validate_at(token, expected, Utc::now()).await
    }

    /// Fails closed. Expired and cross-day tokens are deleted as a side
    /// effect; revoked ones are kept for audit.
    pub async fn validate_at(
        &self,
        token: &str,
        expected: Expected<'_>,
        now: DateTime<Utc>,
    ) -> ServiceResult<TokenCheck> {
        if token.trim().is_empty() {
            return Ok(TokenCheck::Rejected(RejectReason::NotFound));
        }
        let Some(record) = self.tokens.select_one(Filter::all().eq("token", token)).await? else {
            return Ok(TokenCheck::Rejected(RejectReason::NotFound));
        };

        if let Some(reason) = self.rejection(&record, now) {
            if reason.deletes_token() {
                self.tokens.delete(Filter::by_id(record.id.as_str())).await?;
                info!("Deleted session token {}: {}", record.id, reason.as_str());
            }
            return Ok(TokenCheck::Rejected(reason));
        }

        if let Some(email) = expected.email {
            if CryptoVault::blind_index(email).as_deref() != Some(record.email_index.as_str()) {
                return Ok(TokenCheck::Rejected(RejectReason::IdentityMismatch));
            }
        }
        if let Some(role) = expected.role {
            if role != record.role {
                return Ok(TokenCheck::Rejected(RejectReason::RoleMismatch));
            }
        }

        Ok(TokenCheck::Valid(record))
    }

    /// Marks the token inactive. Unknown tokens are a not-found error.
    pub async fn revoke(&self, token: &str) -> ServiceResult<()> {
        let updated = self
            .tokens
            .update(
                Filter::all().eq("token", token),
                patch(json!({"active": false, "revoked_at": Utc::now()})),
            )
            .await?;
        if updated == 0 {
            return Err(ServiceError::not_found("Session token not found"));
        }
        Ok(())
    }

    fn rejection(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<RejectReason> {
        if !token.active {
            return Some(RejectReason::Revoked);
        }
        if token.expires_at <= now {
            return Some(RejectReason::Expired);
        }
        let issued_on = token.created_at.with_timezone(&self.timezone).date_naive();
        let today = now.with_timezone(&self.timezone).date_naive();
        if issued_on != today {
            return Some(RejectReason::DayMismatch);
        }
        None
    }
}

/// 256 random bits, hex encoded.
fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
