//! Response models for the API endpoints.

use crate::models::common::{DatabaseState, HealthStatus, RoleColumnState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub database: DatabaseState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_column: Option<RoleColumnState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn healthy(role_column: RoleColumnState) -> Self {
        Self {
            status: HealthStatus::Healthy,
            database: DatabaseState::Connected,
            role_column: Some(role_column),
            error: None,
        }
    }

    pub fn unhealthy(database: DatabaseState, error: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            database,
            role_column: None,
            error: Some(error),
        }
    }
}
