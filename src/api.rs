use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::pipeline::{HarnessReport, Pipeline, RunReport};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub candidate_limit: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/cron", post(run_cron))
        .route("/test", post(run_harness))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// External trigger: run the pipeline once and return the full report.
async fn run_cron(
    State(state): State<AppState>,
) -> Result<Json<RunReport>, (StatusCode, String)> {
    match state.pipeline.run_once(state.candidate_limit).await {
        Ok(report) => Ok(Json(report)),
        // The only run-fatal case: the feed itself was unreachable.
        Err(e) => Err((StatusCode::BAD_GATEWAY, format!("pipeline run failed: {e:#}"))),
    }
}

#[derive(serde::Deserialize)]
pub struct HarnessRequest {
    pub posts: Vec<u64>,
    pub teams_and_keywords: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub expected: BTreeMap<u64, BTreeSet<String>>,
}

async fn run_harness(
    State(state): State<AppState>,
    Json(req): Json<HarnessRequest>,
) -> Result<Json<HarnessReport>, (StatusCode, String)> {
    state
        .pipeline
        .run_test(&req.posts, &req.teams_and_keywords, &req.expected)
        .await
        .map(Json)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("harness failed: {e:#}"),
            )
        })
}
