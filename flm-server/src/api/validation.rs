//! Cluster validation and merge analysis endpoints

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use flm_core::{find_merge_candidates, validate_clusters, AnalysisParams, MergeReport, ValidationReport};

use super::{body_params, load_datasets, ApiResult};
use crate::AppState;

/// POST /api/validation/run
pub async fn run_validation(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ValidationReport>> {
    let params: AnalysisParams = body_params(&body)?;
    params.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(validate_clusters(
        &legacy,
        &modern,
        &params.thresholds(),
        params.min_faces,
    )))
}

/// POST /api/validation/merge-analysis
pub async fn run_merge_analysis(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<MergeReport>> {
    let params: AnalysisParams = body_params(&body)?;
    params.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(find_merge_candidates(
        &legacy,
        &modern,
        &params.thresholds(),
        params.min_matches,
    )))
}

pub fn validation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/validation/run", post(run_validation))
        .route("/api/validation/merge-analysis", post(run_merge_analysis))
}
