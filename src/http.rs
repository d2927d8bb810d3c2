//! Optional HTTP health surface.
//!
//! Carries no business logic: one fixed status endpoint for deployment
//! health checks.

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::server::McpServer;

/// Serve `GET /health` on the given address until the process exits.
pub async fn serve_health(addr: SocketAddr) -> Result<()> {
    let app = Router::new()
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("health endpoint listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    let mut payload = McpServer::health();
    payload["time"] = serde_json::json!(chrono::Utc::now().to_rfc3339());
    Json(payload)
}
