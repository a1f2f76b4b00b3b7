// src/api/mod.rs
//
// Query API over the latest published frame.
//
// Endpoints:
//   GET  /api/occupancy          counters + activity status
//   GET  /api/health             liveness
//   GET  /api/snapshot           tracks with trails and colors, counters
//   GET  /api/metrics            pipeline metrics summary
//   GET  /api/load               route load (404 without a route)
//   GET  /api/direction          motion currently counted as entering
//   POST /api/direction/reverse  flip which motion counts as entering
//   POST /api/counters/reset     zero entries and exits
//   POST /api/route/depart       commit the current stop
//   POST /api/route/switch       turn the route around

pub mod dto;
pub mod handlers;
pub mod state;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;

pub use state::{AppState, LoopCommand};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/occupancy", get(handlers::occupancy))
        .route("/api/health", get(handlers::health))
        .route("/api/snapshot", get(handlers::snapshot))
        .route("/api/metrics", get(handlers::metrics))
        .route("/api/load", get(handlers::load))
        .route("/api/direction", get(handlers::direction))
        .route("/api/direction/reverse", post(handlers::reverse_direction))
        .route("/api/counters/reset", post(handlers::reset_counters))
        .route("/api/route/depart", post(handlers::route_depart))
        .route("/api/route/switch", post(handlers::route_switch))
        .with_state(state)
}

/// Bind and serve in a background task.
pub async fn spawn_server(bind: &str, state: AppState) -> Result<tokio::task::JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind query API on {}", bind))?;
    let addr = listener
        .local_addr()
        .context("Failed to read query API address")?;
    info!("🌐 Query API listening on http://{}", addr);

    let app = create_router(state);
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Query API stopped: {}", e);
        }
    }))
}
