//! Health endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /health - liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "hermes-gateway",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /ready - readiness probe (checks the database)
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    match sqlx_ping(&state).await {
        Ok(()) => Ok(Json(json!({ "status": "ready" }))),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

async fn sqlx_ping(state: &AppState) -> Result<(), hermes_db::DbError> {
    use hermes_db::repo::UserRepository;
    // Cheapest query that exercises the pool
    state.repos.users.count(None).await?;
    Ok(())
}
