//! Idempotent introduction of the `role` column on the users table.
//!
//! The step checks whether the column exists, adds it as a non-null short
//! string with the baseline role as default, and backfills any row left
//! without a role. Running it again is a no-op. A concurrent run that loses
//! the race to add the column receives a "column already exists" error from
//! the database, which is reported as [`RoleColumnOutcome::ConcurrentlyApplied`]
//! rather than a failure.
//!
//! PostgreSQL and SQLite are supported; both run DDL transactionally, so
//! [`apply_role_column`] wraps the check, the alteration and the backfill in a
//! single transaction.

use sea_orm::sea_query::{
    Alias, ColumnDef, Expr, IntoTableRef, Query, Table, TableAlterStatement, TableRef,
    UpdateStatement,
};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DbErr, FromQueryResult, RuntimeErr, Statement,
    TransactionTrait, Value,
};
use std::borrow::Cow;
use std::env;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

const DUPLICATE_COLUMN: &str = "42701";
const INSUFFICIENT_PRIVILEGE: &str = "42501";
const UNDEFINED_TABLE: &str = "42P01";

const POSTGRES_DESCRIBE_COLUMN: &str = r#"
    SELECT
        column_name::text AS column_name,
        data_type::text AS data_type,
        column_default::text AS column_default,
        is_nullable::text AS is_nullable
    FROM information_schema.columns
    WHERE table_schema = COALESCE($1::text, current_schema())
      AND table_name = $2
      AND column_name = $3
"#;

const SQLITE_DESCRIBE_COLUMN: &str = r#"
    SELECT
        name AS column_name,
        lower(type) AS data_type,
        dflt_value AS column_default,
        CASE WHEN "notnull" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable
    FROM pragma_table_info(?)
    WHERE name = ?
"#;

/// Permission tier stored in the `role` column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the role column lives and what it should look like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleColumnTarget {
    /// Schema namespace; `None` resolves to the connection's current schema.
    /// Ignored on SQLite.
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub baseline_role: Role,
    pub max_length: u32,
}

impl Default for RoleColumnTarget {
    fn default() -> Self {
        Self {
            schema: None,
            table: "users".to_string(),
            column: "role".to_string(),
            baseline_role: Role::Customer,
            max_length: 50,
        }
    }
}

impl RoleColumnTarget {
    /// Default target with the table location taken from `USERS_SCHEMA` and
    /// `USERS_TABLE`. Unset and blank variables keep the defaults.
    pub fn from_env() -> Self {
        Self::located(env_value("USERS_SCHEMA"), env_value("USERS_TABLE"))
    }

    /// Default target in `schema`, on `table` when given.
    pub fn located(schema: Option<String>, table: Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            schema,
            table: table.unwrap_or(defaults.table),
            ..defaults
        }
    }

    /// Table name as shown in notices, e.g. `public.users`.
    pub fn qualified_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }

    fn table_ref(&self, backend: DatabaseBackend) -> TableRef {
        match (&self.schema, backend) {
            (Some(schema), DatabaseBackend::Postgres) => {
                (Alias::new(schema), Alias::new(&self.table)).into_table_ref()
            }
            _ => Alias::new(&self.table).into_table_ref(),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// One row of the verification read.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult)]
pub struct ColumnDescription {
    pub column_name: String,
    pub data_type: String,
    pub column_default: Option<String>,
    pub is_nullable: String,
}

impl ColumnDescription {
    /// Whether the stored type can hold a role name. Follows SQLite's TEXT
    /// affinity rule, which also covers `character varying` and `text`.
    pub fn has_text_type(&self) -> bool {
        let data_type = self.data_type.to_ascii_lowercase();
        ["char", "text", "clob"]
            .iter()
            .any(|fragment| data_type.contains(fragment))
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleColumnOutcome {
    /// The column was created in this run.
    Added { backfilled_rows: u64 },
    /// The column was already there; nothing was changed.
    AlreadyPresent,
    /// Another run added the column between our check and our alteration.
    ConcurrentlyApplied,
}

impl RoleColumnOutcome {
    pub fn performed_ddl(&self) -> bool {
        matches!(self, RoleColumnOutcome::Added { .. })
    }
}

/// Result of [`apply_role_column`]: what happened plus the verification read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleColumnReport {
    pub outcome: RoleColumnOutcome,
    pub column: Option<ColumnDescription>,
}

#[derive(Debug, Error)]
pub enum RoleMigrationError {
    #[error("insufficient privileges to alter {table}: {source}")]
    SchemaPermission {
        table: String,
        #[source]
        source: DbErr,
    },
    #[error("column {column} on {table} already exists with incompatible type {data_type}")]
    SchemaConflict {
        table: String,
        column: String,
        data_type: String,
    },
    #[error("table {table} does not exist")]
    TableNotFound {
        table: String,
        #[source]
        source: DbErr,
    },
    #[error("{0:?} databases are not supported by the role column migration")]
    UnsupportedBackend(DatabaseBackend),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<RoleMigrationError> for DbErr {
    fn from(err: RoleMigrationError) -> Self {
        match err {
            RoleMigrationError::Database(err) => err,
            other => DbErr::Migration(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DdlFailure {
    DuplicateColumn,
    InsufficientPrivilege,
    UndefinedTable,
    Other,
}

fn sql_state(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(inner)) | DbErr::Query(RuntimeErr::SqlxError(inner)) => {
            inner
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .map(Cow::into_owned)
        }
        _ => None,
    }
}

/// PostgreSQL reports SQLSTATE codes; SQLite only has generic result codes,
/// so its failures are recognised by message.
fn classify_failure(err: &DbErr) -> DdlFailure {
    match sql_state(err).as_deref() {
        Some(DUPLICATE_COLUMN) => return DdlFailure::DuplicateColumn,
        Some(INSUFFICIENT_PRIVILEGE) => return DdlFailure::InsufficientPrivilege,
        Some(UNDEFINED_TABLE) => return DdlFailure::UndefinedTable,
        _ => {}
    }
    let message = err.to_string().to_lowercase();
    if message.contains("duplicate column") || message.contains("already exists") {
        DdlFailure::DuplicateColumn
    } else if message.contains("permission denied") || message.contains("must be owner") {
        DdlFailure::InsufficientPrivilege
    } else if message.contains("no such table") || message.contains("does not exist") {
        DdlFailure::UndefinedTable
    } else {
        DdlFailure::Other
    }
}

fn add_column_statement(target: &RoleColumnTarget, backend: DatabaseBackend) -> TableAlterStatement {
    Table::alter()
        .table(target.table_ref(backend))
        .add_column(
            ColumnDef::new(Alias::new(&target.column))
                .string_len(target.max_length)
                .not_null()
                .default(target.baseline_role.as_str()),
        )
        .to_owned()
}

pub(crate) fn drop_column_statement(
    target: &RoleColumnTarget,
    backend: DatabaseBackend,
) -> TableAlterStatement {
    Table::alter()
        .table(target.table_ref(backend))
        .drop_column(Alias::new(&target.column))
        .to_owned()
}

fn backfill_statement(target: &RoleColumnTarget, backend: DatabaseBackend) -> UpdateStatement {
    Query::update()
        .table(target.table_ref(backend))
        .value(Alias::new(&target.column), target.baseline_role.as_str())
        .and_where(Expr::col(Alias::new(&target.column)).is_null())
        .to_owned()
}

/// Reads name, storage type, default and nullability of the role column.
/// Returns `None` when the column does not exist.
pub async fn describe_role_column<C>(
    conn: &C,
    target: &RoleColumnTarget,
) -> Result<Option<ColumnDescription>, RoleMigrationError>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();
    let statement = match backend {
        DatabaseBackend::Postgres => Statement::from_sql_and_values(
            backend,
            POSTGRES_DESCRIBE_COLUMN,
            [
                Value::from(target.schema.clone()),
                Value::from(target.table.clone()),
                Value::from(target.column.clone()),
            ],
        ),
        DatabaseBackend::Sqlite => Statement::from_sql_and_values(
            backend,
            SQLITE_DESCRIBE_COLUMN,
            [
                Value::from(target.table.clone()),
                Value::from(target.column.clone()),
            ],
        ),
        other => return Err(RoleMigrationError::UnsupportedBackend(other)),
    };
    let row = conn.query_one(statement).await?;
    let description = row
        .map(|row| ColumnDescription::from_query_result(&row, ""))
        .transpose()?;
    Ok(description)
}

/// Adds the role column if it is missing. Callers own the transaction; on
/// [`RoleColumnOutcome::ConcurrentlyApplied`] a PostgreSQL transaction is
/// aborted and must be rolled back.
pub async fn ensure_role_column<C>(
    conn: &C,
    target: &RoleColumnTarget,
) -> Result<RoleColumnOutcome, RoleMigrationError>
where
    C: ConnectionTrait,
{
    let table = target.qualified_table();
    if let Some(existing) = describe_role_column(conn, target).await? {
        if !existing.has_text_type() {
            return Err(RoleMigrationError::SchemaConflict {
                table,
                column: existing.column_name,
                data_type: existing.data_type,
            });
        }
        if existing.is_nullable() {
            warn!(
                %table,
                column = %target.column,
                "role column already exists but allows NULL, filling rows without a role"
            );
            let backfilled_rows = backfill(conn, target, &table).await?;
            info!(%table, column = %target.column, backfilled_rows, "backfilled existing role column");
        } else {
            info!(%table, column = %target.column, "role column already exists, no changes made");
        }
        return Ok(RoleColumnOutcome::AlreadyPresent);
    }

    let backend = conn.get_database_backend();
    if let Err(err) = conn
        .execute(backend.build(&add_column_statement(target, backend)))
        .await
    {
        if classify_failure(&err) == DdlFailure::DuplicateColumn {
            info!(%table, column = %target.column, "role column was added by a concurrent run");
            return Ok(RoleColumnOutcome::ConcurrentlyApplied);
        }
        return Err(into_migration_error(err, table));
    }

    let backfilled_rows = backfill(conn, target, &table).await?;
    info!(
        %table,
        column = %target.column,
        baseline_role = %target.baseline_role,
        backfilled_rows,
        "added role column"
    );
    Ok(RoleColumnOutcome::Added { backfilled_rows })
}

async fn backfill<C>(conn: &C, target: &RoleColumnTarget, table: &str) -> Result<u64, RoleMigrationError>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();
    let result = conn
        .execute(backend.build(&backfill_statement(target, backend)))
        .await
        .map_err(|err| into_migration_error(err, table.to_string()))?;
    Ok(result.rows_affected())
}

fn into_migration_error(err: DbErr, table: String) -> RoleMigrationError {
    match classify_failure(&err) {
        DdlFailure::InsufficientPrivilege => RoleMigrationError::SchemaPermission { table, source: err },
        DdlFailure::UndefinedTable => RoleMigrationError::TableNotFound { table, source: err },
        DdlFailure::DuplicateColumn | DdlFailure::Other => RoleMigrationError::Database(err),
    }
}

/// Runs [`ensure_role_column`] in its own transaction and follows it with the
/// verification read.
pub async fn apply_role_column<C>(
    db: &C,
    target: &RoleColumnTarget,
) -> Result<RoleColumnReport, RoleMigrationError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let outcome = match ensure_role_column(&txn, target).await {
        Ok(RoleColumnOutcome::ConcurrentlyApplied) => {
            txn.rollback().await?;
            RoleColumnOutcome::ConcurrentlyApplied
        }
        Ok(outcome) => {
            txn.commit().await?;
            outcome
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(%rollback_err, "Could not roll back role column transaction");
            }
            return Err(err);
        }
    };
    let column = describe_role_column(db, target).await?;
    Ok(RoleColumnReport { outcome, column })
}
