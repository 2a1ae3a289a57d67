use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::any, Router};
use tracing::{error, info};

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/run", any(trigger_run))
        .route("/health", any(health))
        .fallback(not_found)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Start a run in the background and answer immediately.
async fn trigger_run(State(state): State<ApiState>) -> (StatusCode, &'static str) {
    info!("Manual run triggered");
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        if let Err(e) = pipeline.run_once().await {
            error!("Manual run failed: {e}");
        }
    });
    (StatusCode::ACCEPTED, "Job triggered")
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
