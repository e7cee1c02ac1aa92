//! Operator tool for the users schema.
//!
//! `migrate ensure-role` is safe to run any number of times: it adds the
//! `role` column when it is missing and otherwise only reports that it
//! exists. Both cases exit successfully.

use clap::{Parser, Subcommand};
use migration::ColumnDescription;
use productivity_dashboard_api::config::build_app_config_with;
use productivity_dashboard_api::init_tracing;
use productivity_dashboard_api::repos::schema_repo::DBSchemaRepo;
use productivity_dashboard_api::services::schema_service::SchemaService;
use sea_orm::Database;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

const VERIFICATION_HEADERS: [&str; 4] = ["column_name", "data_type", "column_default", "is_nullable"];

#[derive(Debug, Parser)]
#[command(name = "migrate", about = "Schema migrations for the productivity dashboard database")]
struct Cli {
    /// Database to migrate
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply all pending revisions
    Up,
    /// List revisions that have not been applied yet
    Status,
    /// Add the users role column if it is missing, then print it
    EnsureRole,
    /// Print the users role column as the database describes it
    Verify,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let app_config = build_app_config_with(cli.database_url)?;
    info!("Connecting to database...");
    let db_session = Database::connect(app_config.database_url.clone()).await?;
    let schema_service = SchemaService {
        schema_repo: Arc::new(DBSchemaRepo {
            db_session,
            target: app_config.role_column_target(),
        }),
    };

    match cli.command {
        Command::Up => {
            schema_service.run_migrations().await?;
        }
        Command::Status => {
            let pending = schema_service.pending_migrations().await?;
            if pending.is_empty() {
                println!("No pending migrations");
            }
            for name in pending {
                println!("pending  {name}");
            }
        }
        Command::EnsureRole => {
            let report = schema_service.ensure_role_column().await?;
            print_verification(report.column.as_ref());
        }
        Command::Verify => {
            let column = schema_service.verify_role_column().await?;
            print_verification(column.as_ref());
        }
    }
    Ok(())
}

/// Prints the verification read as a psql-style table.
fn print_verification(column: Option<&ColumnDescription>) {
    let row = column.map(|column| {
        [
            column.column_name.clone(),
            column.data_type.clone(),
            column.column_default.clone().unwrap_or_default(),
            column.is_nullable.clone(),
        ]
    });
    let widths: Vec<usize> = VERIFICATION_HEADERS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            row.as_ref()
                .map_or(header.len(), |row| header.len().max(row[i].len()))
        })
        .collect();

    let format_line = |cells: &[&str]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!(" {cell:<width$} "))
            .collect::<Vec<_>>()
            .join("|")
    };
    println!("{}", format_line(&VERIFICATION_HEADERS));
    println!(
        "{}",
        widths
            .iter()
            .map(|width| "-".repeat(width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    match &row {
        Some(row) => {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            println!("{}", format_line(&cells));
            println!("(1 row)");
        }
        None => println!("(0 rows)"),
    }
}
