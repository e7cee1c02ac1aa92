use async_trait::async_trait;
use migration::{
    apply_role_column, describe_role_column, ColumnDescription, Migrator, MigratorTrait,
    RoleColumnReport, RoleColumnTarget, RoleMigrationError,
};
use sea_orm::{DatabaseConnection, DbErr};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct DBSchemaRepo {
    pub db_session: DatabaseConnection,
    pub target: RoleColumnTarget,
}

#[async_trait]
pub trait SchemaRepo: Send + Sync {
    async fn ping(&self) -> Result<(), DbErr>;
    async fn describe_role_column(&self) -> Result<Option<ColumnDescription>, RoleMigrationError>;
    async fn apply_role_column(&self) -> Result<RoleColumnReport, RoleMigrationError>;
    async fn run_migrations(&self) -> Result<(), DbErr>;
    async fn pending_migrations(&self) -> Result<Vec<String>, DbErr>;
}

#[async_trait]
impl SchemaRepo for DBSchemaRepo {
    async fn ping(&self) -> Result<(), DbErr> {
        self.db_session.ping().await
    }

    async fn describe_role_column(&self) -> Result<Option<ColumnDescription>, RoleMigrationError> {
        describe_role_column(&self.db_session, &self.target).await
    }

    async fn apply_role_column(&self) -> Result<RoleColumnReport, RoleMigrationError> {
        apply_role_column(&self.db_session, &self.target).await
    }

    async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.db_session, None).await?;
        info!("All migrations applied.");
        Ok(())
    }

    async fn pending_migrations(&self) -> Result<Vec<String>, DbErr> {
        let pending = Migrator::get_pending_migrations(&self.db_session).await?;
        Ok(pending
            .iter()
            .map(|migration| migration.name().to_string())
            .collect())
    }
}
