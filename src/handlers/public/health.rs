// handlers/public/health.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Estate API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Property listing service with owner-scoped media",
            "endpoints": {
                "auth": "/auth/register, /auth/login, /auth/logout (public)",
                "assets": "/assets[/:asset_id[/contacts|/images]] (reads public, writes owner-only)",
                "me": "/me[/assets|/password|/profile-image] (authenticated)",
                "admin": "/admin/users (admin)",
                "uploads": "/uploads/* (static)"
            }
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
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
