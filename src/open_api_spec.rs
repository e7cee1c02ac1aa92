use crate::models::common::{DatabaseState, HealthStatus, RoleColumnState};
use crate::models::response::HealthResponse;
use utoipa::OpenApi;

/// OpenAPI specification for the Productivity Dashboard API
#[derive(OpenApi)]
#[openapi(
    info(title = "Personal Productivity Dashboard API"),
    paths(crate::routes::health::healthcheck),
    components(schemas(HealthResponse, HealthStatus, DatabaseState, RoleColumnState)),
    tags((name = "Health", description = "Health check endpoints"))
)]
pub struct ApiDoc;
