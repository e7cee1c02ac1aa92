//! Health route.
//!
//! Reports database connectivity and whether the users table carries the role
//! column. A missing role column is reported but does not fail the check; an
//! unreachable database does.

use crate::app_factory::AppState;
use crate::models::common::HealthStatus;
use crate::models::response::HealthResponse;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Healthcheck route for uptime checks and deploy verification
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable or users table unreadable", body = HealthResponse)
    )
)]
pub async fn healthcheck(State(state): State<AppState>) -> Response {
    let health = state.schema_service.health().await;
    let status = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(health)).into_response()
}
