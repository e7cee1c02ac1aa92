//! Test utilities for creating mock implementations and test fixtures.
//! This module provides an in-memory implementation of the schema repository
//! so services and routes can be tested without a database.

use crate::app_factory::{create_app, AppState};
use crate::repos::schema_repo::SchemaRepo;
use crate::services::schema_service::SchemaService;
use async_trait::async_trait;
use axum::Router;
use migration::{
    ColumnDescription, RoleColumnOutcome, RoleColumnReport, RoleMigrationError,
};
use sea_orm::{DbErr, RuntimeErr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory users table that only tracks whether the role column exists.
#[derive(Debug, Default)]
pub struct InMemorySchemaRepo {
    reachable: bool,
    role_column: Mutex<Option<ColumnDescription>>,
    ddl_count: AtomicUsize,
}

impl InMemorySchemaRepo {
    pub fn with_column(role_column: Option<ColumnDescription>) -> Self {
        Self {
            reachable: true,
            role_column: Mutex::new(role_column),
            ddl_count: AtomicUsize::new(0),
        }
    }

    pub fn with_role_column() -> Self {
        Self::with_column(Some(mock_role_column()))
    }

    pub fn without_role_column() -> Self {
        Self::with_column(None)
    }

    /// Every call fails as if the database were down.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Number of times the role column was added.
    pub fn ddl_count(&self) -> usize {
        self.ddl_count.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), DbErr> {
        if self.reachable {
            Ok(())
        } else {
            Err(DbErr::Conn(RuntimeErr::Internal(
                "connection refused".to_string(),
            )))
        }
    }
}

#[async_trait]
impl SchemaRepo for InMemorySchemaRepo {
    async fn ping(&self) -> Result<(), DbErr> {
        self.check_reachable()
    }

    async fn describe_role_column(&self) -> Result<Option<ColumnDescription>, RoleMigrationError> {
        self.check_reachable()?;
        Ok(self.role_column.lock().unwrap().clone())
    }

    /// Adds the column on first call, no-ops afterwards.
    async fn apply_role_column(&self) -> Result<RoleColumnReport, RoleMigrationError> {
        self.check_reachable()?;
        let mut role_column = self.role_column.lock().unwrap();
        let outcome = match *role_column {
            Some(_) => RoleColumnOutcome::AlreadyPresent,
            None => {
                *role_column = Some(mock_role_column());
                self.ddl_count.fetch_add(1, Ordering::SeqCst);
                RoleColumnOutcome::Added { backfilled_rows: 0 }
            }
        };
        Ok(RoleColumnReport {
            outcome,
            column: role_column.clone(),
        })
    }

    async fn run_migrations(&self) -> Result<(), DbErr> {
        self.check_reachable()
    }

    async fn pending_migrations(&self) -> Result<Vec<String>, DbErr> {
        self.check_reachable()?;
        Ok(vec![])
    }
}

/// The column as PostgreSQL describes it after the migration.
pub fn mock_role_column() -> ColumnDescription {
    ColumnDescription {
        column_name: "role".to_string(),
        data_type: "character varying".to_string(),
        column_default: Some("'CUSTOMER'::character varying".to_string()),
        is_nullable: "NO".to_string(),
    }
}

pub fn build_test_schema_service(schema_repo: InMemorySchemaRepo) -> SchemaService {
    SchemaService {
        schema_repo: Arc::new(schema_repo),
    }
}

/// Creates a test application instance backed by the given in-memory repo.
/// The returned Router can be used with axum test utilities.
pub fn build_test_app_with(schema_repo: InMemorySchemaRepo) -> Router {
    let app_state = AppState {
        schema_service: build_test_schema_service(schema_repo),
    };
    create_app(app_state, vec![], true)
}

/// Creates a test application against an already migrated database.
pub fn build_test_app() -> Router {
    build_test_app_with(InMemorySchemaRepo::with_role_column())
}
