//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

pub mod configuration;
pub mod extract;
pub mod metadata;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

const SWAGGER_UI_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/4.15.5";

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    let mut router = Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/v1/", get(configuration::welcome))
        .nest("/v1", api_routes(state.clone()));

    if state.openapi_json.is_some() {
        router = router.route("/openapi.json", get(openapi_document));
    }
    if settings.docs.enable_swagger && state.openapi_json.is_some() {
        router = router.route("/docs/", get(swagger_ui));
    }

    router.layer(middleware).with_state(state)
}

/// Catalog routes, all behind token authentication
fn api_routes(state: SharedState) -> Router<SharedState> {
    Router::new()
        // Configuration
        .route("/domains/", get(configuration::list_domains))
        .route("/domains/{id}", get(configuration::get_domain))
        .route("/data-providers/", get(configuration::list_data_providers))
        .route("/data-providers/{id}", get(configuration::get_data_provider))
        .route("/clients/", get(configuration::list_clients))
        .route("/clients/{id}", get(configuration::get_client))
        .route("/data-assets/", get(configuration::list_data_assets))
        .route("/data-assets/{id}", get(configuration::get_data_asset))
        .route("/data-assets/instances/", get(configuration::list_data_asset_instances))
        .route("/data-assets/instances/{id}", get(configuration::get_data_asset_instance))
        .route(
            "/data-assets/instances/{id}/source",
            get(configuration::get_data_asset_instance_source),
        )
        .route(
            "/data-assets/instances/{id}/functions",
            get(configuration::list_function_mappings),
        )
        .route(
            "/data-assets/instances/upsert",
            post(configuration::upsert_data_asset_instance),
        )
        // Metadata
        .route("/pipeline-tasks", post(metadata::create_pipeline_task))
        .route(
            "/pipeline-tasks/{id}",
            get(metadata::get_pipeline_task).patch(metadata::update_pipeline_task),
        )
        .layer(from_fn_with_state(state.auth.clone(), auth_middleware))
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn openapi_document(State(state): State<SharedState>) -> Response {
    match &state.openapi_json {
        Some(json) => ([(header::CONTENT_TYPE, "application/json")], json.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn swagger_ui() -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Galactic Core API</title>
  <link rel="stylesheet" href="{cdn}/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="{cdn}/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "/openapi.json", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>"##,
        cdn = SWAGGER_UI_CDN
    ))
}
