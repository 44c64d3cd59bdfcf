use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use shared::ReferenceSet;

mod routes;
mod storage;

/// Environment variable with the listen address
const BIND_ENV: &str = "POLYFORM_BIND";
const DEFAULT_BIND: &str = "0.0.0.0:3001";

#[derive(Clone)]
pub struct AppState {
    pub reference: Arc<ReferenceSet>,
    pub chains: Arc<storage::ChainStore>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            reference: Arc::new(ReferenceSet::builtin()),
            chains: Arc::new(storage::ChainStore::default()),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/fold-angle/{a}/{b}", get(routes::fold_angle))
        .route("/api/primitive/{sides}", get(routes::primitive))
        .route("/api/reference", get(routes::reference))
        .route("/api/chains", get(routes::list_chains).post(routes::register_chain))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let bind = std::env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let state = AppState::default();
    tracing::info!(entries = state.reference.len(), "reference set ready");

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Catalog running on http://{bind}");
    axum::serve(listener, app(state)).await
}
