//! Application factory module for configuring and building the API server.
//!
//! This module handles the setup of:
//! - CORS configuration
//! - Middleware stack (timeout, tracing)
//! - Route registration

use crate::open_api_spec::ApiDoc;
use crate::routes::health::healthcheck;
use crate::services::schema_service::SchemaService;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::routing::get;
use axum::{Json, Router};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info_span;
use utoipa::OpenApi;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub schema_service: SchemaService,
}

/// Creates and configures the main application router with middleware and routes.
///
/// # Arguments
/// * `app_state` - Shared application state containing service instances
/// * `cors_origins` - List of allowed CORS origins
/// * `test` - Boolean flag to send logs through the test harness writer
pub fn create_app(app_state: AppState, cors_origins: Vec<HeaderValue>, test: bool) -> Router {
    // every test builds its own app; the first one installs the global
    // test-writer subscriber and the rest reuse it
    if test {
        crate::init_test_tracing();
    }
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_origin(cors_origins)
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);
    build_routes().layer(cors).with_state(app_state)
}

/// Builds the application routes with middleware stack.
///
/// Configures:
/// - Request tracing with method and path logging
/// - 30 second timeout
/// - Health check endpoint
/// - OpenAPI document
fn build_routes() -> Router<AppState> {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let matched_path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);
                info_span!(
                    "http_request",
                    method = ?request.method(),
                    request_path = matched_path,
                )
            }),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(30)));
    Router::new()
        .route(
            "/docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/health", get(healthcheck))
        .layer(middleware)
}
