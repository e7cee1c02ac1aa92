use crate::models::common::{DatabaseState, RoleColumnState};
use crate::models::response::HealthResponse;
use crate::repos::schema_repo::SchemaRepo;
use migration::{ColumnDescription, RoleColumnOutcome, RoleColumnReport, RoleMigrationError};
use sea_orm::DbErr;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct SchemaService {
    pub schema_repo: Arc<dyn SchemaRepo>,
}

impl SchemaService {
    pub async fn role_column_state(&self) -> Result<RoleColumnState, RoleMigrationError> {
        let state = match self.schema_repo.describe_role_column().await? {
            Some(column) if column.has_text_type() => RoleColumnState::Present,
            Some(_) => RoleColumnState::Incompatible,
            None => RoleColumnState::Missing,
        };
        Ok(state)
    }

    /// Logs connectivity and role column state. Never fails: a service with a
    /// missing role column still starts.
    pub async fn check_on_startup(self) {
        info!("Checking database connection...");
        if let Err(err) = self.schema_repo.ping().await {
            error!(%err, "Database connection failed");
            return;
        }
        info!("Database connection successful");
        match self.role_column_state().await {
            Ok(RoleColumnState::Present) => info!("Role column verified on users table"),
            Ok(RoleColumnState::Missing) => {
                warn!("Role column missing in users table. Run: migrate ensure-role")
            }
            Ok(RoleColumnState::Incompatible) => {
                warn!("Role column on users table has an incompatible type")
            }
            Err(err) => error!(%err, "Could not inspect users table"),
        }
    }

    pub async fn health(self) -> HealthResponse {
        if let Err(err) = self.schema_repo.ping().await {
            error!(%err, "Healthcheck could not reach the database");
            return HealthResponse::unhealthy(DatabaseState::Disconnected, err.to_string());
        }
        match self.role_column_state().await {
            Ok(state) => HealthResponse::healthy(state),
            Err(err) => {
                error!(%err, "Healthcheck could not inspect users table");
                HealthResponse::unhealthy(DatabaseState::Connected, err.to_string())
            }
        }
    }

    pub async fn ensure_role_column(self) -> Result<RoleColumnReport, RoleMigrationError> {
        let report = self.schema_repo.apply_role_column().await?;
        match report.outcome {
            RoleColumnOutcome::Added { backfilled_rows } => {
                info!(backfilled_rows, "Role column added with default role CUSTOMER")
            }
            RoleColumnOutcome::AlreadyPresent => info!("Role column already exists"),
            RoleColumnOutcome::ConcurrentlyApplied => {
                info!("Role column was added by another run")
            }
        }
        if report.column.is_none() {
            warn!("Role column not found by verification read");
        }
        Ok(report)
    }

    pub async fn verify_role_column(self) -> Result<Option<ColumnDescription>, RoleMigrationError> {
        self.schema_repo.describe_role_column().await
    }

    pub async fn run_migrations(self) -> Result<(), DbErr> {
        self.schema_repo.run_migrations().await
    }

    pub async fn pending_migrations(self) -> Result<Vec<String>, DbErr> {
        self.schema_repo.pending_migrations().await
    }
}
