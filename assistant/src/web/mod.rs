//! HTTP API for chat and approval
//!
//! Thin transport over [`TurnOrchestrator`](crate::orchestrator::TurnOrchestrator):
//! every handler is one orchestrator call plus error mapping.

pub mod api;
pub mod state;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Configuration for the web server
pub struct WebConfig {
    pub port: u16,
}

/// Start the web server
pub async fn serve(config: WebConfig, state: AppState) -> Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting web server on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(api::chat))
        .route("/approval", post(api::approval))
        .route("/threads", get(api::list_threads))
        .route("/threads/:id", get(api::get_thread))
        .route("/health", get(api::health_check));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
