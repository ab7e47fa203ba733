use axum::{extract::State, response::Json};
use serde_json::json;

use crate::{errors::Result, handlers::AppState};

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Process is up")),
    tag = "health"
)]
pub async fn liveness() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses((status = 200, description = "Storage reachability")),
    tag = "health"
)]
pub async fn readiness(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let db_status = match &state.database {
        Some(database) => match database.ping().await {
            Ok(()) => "healthy",
            Err(_) => "unhealthy",
        },
        None => "in_memory",
    };

    let overall_status = if db_status == "unhealthy" {
        "not_ready"
    } else {
        "ready"
    };

    Ok(Json(json!({
        "status": overall_status,
        "checks": {
            "database": db_status
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
