// handlers/public/root.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Service descriptor
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Docflow API",
            "version": version,
            "description": "HR form workflow backend: submissions, generated documents, approvals and signatures",
            "environment": state.config.environment,
            "storage": state.backend.kind(),
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login (public - token acquisition)",
                "auth": "/api/auth/* (protected)",
                "forms": "/api/forms (protected)",
                "responses": "/api/responses[/:id[/document|/correction|/approve|/approved|/publish|/signature|/messages]] (protected)",
                "documents": "/api/documents/:generated_id[/download] (protected)",
                "messages": "/api/messages/read-all (protected)",
                "workflows": "/api/workflows[/:id[/nodes/:node_id]], /api/workflows/migrate (protected)",
                "companies": "/api/companies[/:id/logo] (protected)",
            }
        }
    }))
}

/// GET /health - Storage ping
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.backend.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": state.backend.kind()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
