//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::openapi::openapi_json;
use super::routes::{cache, health};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until the shutdown signal fires. Returns the CoreApp so the
    /// caller can finish graceful shutdown.
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;

        let addr = SocketAddr::new(
            app.config.server.host.parse()?,
            app.config.server.port,
        );

        let api_routes = Router::new()
            .route("/health", get(health::health))
            .merge(cache::routes(app.cache.clone()));

        let router = Router::new()
            .nest("/api/v1", api_routes)
            .route("/openapi.json", get(openapi_json))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(app.shutdown.wait())
            .await?;

        Ok(app)
    }
}
