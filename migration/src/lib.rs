pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users;
mod m20250601_000001_add_user_role;
pub mod role_column;

pub use role_column::{
    apply_role_column, describe_role_column, ensure_role_column, ColumnDescription, Role,
    RoleColumnOutcome, RoleColumnReport, RoleColumnTarget, RoleMigrationError,
};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users::Migration),
            Box::new(m20250601_000001_add_user_role::Migration::from_env()),
        ]
    }
}
