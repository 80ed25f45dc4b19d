// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ServiceError, UserProfile};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// POST /auth/login - Check credentials and receive a session token
///
/// A still-valid token issued earlier today is returned again instead of
/// minting a new one.
///
/// Expected Input:
/// ```json
/// { "email": "ana@empresa.cl", "password": "..." }
/// ```
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "9f2c...e1",
///     "expires_at": "2025-01-01T13:00:00Z",
///     "user": { "id": "...", "name": "Ana", "email": "ana@empresa.cl", "role": "admin", "company": null }
///   }
/// }
/// ```
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation_error("Email and password are required", None));
    }

    let user = match state.users.authenticate(&payload.email, &payload.password).await {
        Ok(user) => user,
        Err(ServiceError::Unauthorized(msg)) => {
            warn!("Failed login attempt");
            return Err(ApiError::unauthorized(msg));
        }
        Err(e) => return Err(e.into()),
    };

    let session = state.tokens.issue(&user.email, &user.role).await?;
    info!("User {} logged in", user.id);

    Ok(ApiResponse::success(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}
