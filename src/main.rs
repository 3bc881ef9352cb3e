//! Roster engine HTTP server.
//!
//! Run with: cargo run
//! Then POST to: http://localhost:7860/rosters

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use roster_engine::api;
use roster_engine::config::RunConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("ROSTER_ENGINE_CONFIG") {
        Ok(path) => match std::fs::read_to_string(&path).and_then(|text| {
            RunConfig::from_toml_str(&text).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        }) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(%path, error = %e, "failed to load config override, using defaults");
                RunConfig::default()
            }
        },
        Err(_) => RunConfig::default(),
    };

    let state = Arc::new(api::AppState::new(config));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], 7860));
    tracing::info!(%addr, "starting roster engine");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
