use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{Expected, RejectReason, TokenCheck};

/// GET /api/auth/whoami - Current caller
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": { "user_id": "...", "name": "Ana", "email": "ana@empresa.cl", "role": "admin", "company": "ACME", "internal": false }
/// }
/// ```
pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(user))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub token: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

/// POST /api/auth/validate - Check a token, optionally against an expected identity
///
/// Rejections are reported in the body, not as an error status. Expired
/// tokens and tokens from an earlier day are deleted as a side effect.
///
/// Expected Input:
/// ```json
/// { "token": "9f2c...e1", "email": "ana@empresa.cl", "role": "admin" }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "valid": false, "reason": "day_mismatch" } }
/// ```
pub async fn validate(
    State(state): State<AppState>,
    Json(payload): Json<ValidateRequest>,
) -> ApiResult<ValidateResponse> {
    if payload.token.trim().is_empty() {
        return Err(ApiError::validation_error("Token is required", None));
    }

    let expected = Expected {
        email: payload.email.as_deref(),
        role: payload.role.as_deref(),
    };
    let check = state.tokens.validate(payload.token.trim(), expected).await?;

    Ok(ApiResponse::success(ValidateResponse {
        valid: check.is_valid(),
        reason: match check {
            TokenCheck::Valid(_) => None,
            TokenCheck::Rejected(reason) => Some(reason),
        },
    }))
}

/// DELETE /api/auth/session - Revoke the caller's session token
pub async fn logout(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<serde_json::Value> {
    let Some(token) = user.token.as_deref() else {
        return Err(ApiError::bad_request("Internal requests have no session to revoke"));
    };
    state.tokens.revoke(token).await?;
    info!("Session revoked for user {}", user.user_id);

    Ok(ApiResponse::success(serde_json::json!({ "revoked": true })))
}
