use productivity_dashboard_api::app_factory::{create_app, AppState};
use productivity_dashboard_api::config::build_app_config;
use productivity_dashboard_api::init_tracing;
use productivity_dashboard_api::repos::schema_repo::DBSchemaRepo;
use productivity_dashboard_api::services::schema_service::SchemaService;
use sea_orm::Database;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let app_config = build_app_config()?;
    let db_session = Database::connect(app_config.database_url.clone()).await?;
    let schema_repo = DBSchemaRepo {
        db_session,
        target: app_config.role_column_target(),
    };
    let schema_service = SchemaService {
        schema_repo: Arc::new(schema_repo),
    };
    schema_service.clone().check_on_startup().await;
    let app_state = AppState { schema_service };
    let app = create_app(app_state, app_config.cors_urls, false);

    let addr: SocketAddr = app_config.listener_address.parse()?;

    info!("listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
