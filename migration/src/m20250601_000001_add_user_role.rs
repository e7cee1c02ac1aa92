use crate::role_column::{
    describe_role_column, drop_column_statement, ensure_role_column, RoleColumnOutcome,
    RoleColumnTarget,
};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration {
    pub target: RoleColumnTarget,
}

impl Migration {
    /// Revision for the users table named by `USERS_SCHEMA` and `USERS_TABLE`.
    pub fn from_env() -> Self {
        Self {
            target: RoleColumnTarget::from_env(),
        }
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let outcome = ensure_role_column(manager.get_connection(), &self.target).await?;
        // the migrator shares one transaction across revisions, so a lost race
        // leaves it aborted; re-running finds the column and no-ops
        if outcome == RoleColumnOutcome::ConcurrentlyApplied {
            return Err(DbErr::Migration(format!(
                "{}.{} was added by a concurrent run; re-run the migrations",
                self.target.qualified_table(),
                self.target.column
            )));
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        if describe_role_column(conn, &self.target).await?.is_none() {
            return Ok(());
        }
        let backend = manager.get_database_backend();
        conn.execute(backend.build(&drop_column_statement(&self.target, backend)))
            .await?;
        Ok(())
    }
}
