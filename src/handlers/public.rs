use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::health_check;
use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Branch Records API",
            "version": version,
            "endpoints": {
                "health": "/health (public)",
                "accounts": "/api/accounts[/:id] (protected)",
                "profiles": "/api/profiles[/:id] (protected)",
                "verification_requests": "/api/verification-requests[/:id] (protected)",
                "agents": "/api/agents[/:id] (admin)",
            }
        }
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match health_check(&state.pool).await {
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
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
