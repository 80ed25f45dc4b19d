use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::tokens::{Expected, TokenCheck};

/// Header carrying the shared key of trusted internal callers.
pub const INTERNAL_REQUEST_HEADER: &str = "x-internal-request";

/// Caller identity, inserted into request extensions by the auth middleware.
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub company: String,
    /// Pre-authorized internal request; no session token involved.
    pub internal: bool,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl AuthUser {
    pub fn internal() -> Self {
        Self {
            user_id: "internal".to_string(),
            name: "Sistema".to_string(),
            email: String::new(),
            role: "internal".to_string(),
            company: String::new(),
            internal: true,
            token: None,
        }
    }
}

/// Session token authentication. Requests marked with the internal key skip
/// token validation entirely.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &headers).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    if is_internal_request(state, headers) {
        debug!("Internal request, skipping token validation");
        return Ok(AuthUser::internal());
    }

    let token = extract_bearer_token(headers).map_err(ApiError::unauthorized)?;
    let record = match state.tokens.validate(&token, Expected::default()).await? {
        TokenCheck::Valid(record) => record,
        TokenCheck::Rejected(reason) => {
            return Err(ApiError::unauthorized(format!("Invalid session: {}", reason.as_str())))
        }
    };

    let profile = state
        .users
        .find_by_email_index(&record.email_index)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid session: token belongs to another user"))?;

    Ok(AuthUser {
        user_id: profile.id,
        name: profile.name,
        email: profile.email,
        role: record.role,
        company: profile.company.unwrap_or_default(),
        internal: false,
        token: Some(token),
    })
}

fn is_internal_request(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.config.security.internal_api_key.as_deref() else {
        return false;
    };
    headers
        .get(INTERNAL_REQUEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false)
}

/// Extract the session token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty session token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
