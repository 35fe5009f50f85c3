//! HTTP server implementation using Axum.

use crate::handlers::{github_release, health, language_updates, library_updates, package_updates};
use crate::rate_limit::{rate_limit, FixedWindowLimiter};
use axum::{middleware, routing::get, Router};
use relwatch_core::UpdateService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Cached upstream lookups
    pub service: UpdateService,
    /// Per-IP limiter for the `/api` routes
    pub limiter: FixedWindowLimiter,
}

impl AppState {
    pub fn new(service: UpdateService, limiter: FixedWindowLimiter) -> Self {
        Self { service, limiter }
    }
}

/// Build the router. `/health` is outside the rate limit.
///
/// The limiter reads the peer address from `ConnectInfo`, so serve the router
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/updates/languages", get(language_updates))
        .route("/api/updates/libraries", get(library_updates))
        .route("/api/updates/package/:package", get(package_updates))
        .route("/api/updates/github/:owner/:repo", get(github_release))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    // Dashboard is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
