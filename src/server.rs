use crate::app::ModuleRegistry;
use crate::config::ServerConfig;
use crate::constants::API_PREFIX;
use crate::handlers::{self, administrative, doctor, patient};
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Builds the full router: the three actor namespaces under `/api/v1`
/// plus an unversioned health check.
pub fn create_router(registry: Arc<ModuleRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let api = Router::new()
        .nest("/administrative", administrative::routes())
        .nest("/doctor", doctor::routes())
        .nest("/patient", patient::routes());

    Router::new()
        .route("/health", get(handlers::health))
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(registry)
}

/// Binds the configured address and serves until the process is stopped
pub async fn start_server(config: &ServerConfig, registry: Arc<ModuleRegistry>) -> anyhow::Result<()> {
    let app = create_router(registry);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("🚀 Clinic API listening on http://{}", bind_addr);
    info!("📋 Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
