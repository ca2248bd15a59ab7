//! Matching, analytics and full-analysis endpoints

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use flm_core::aggregate::{MatchStats, UnmatchedReport};
use flm_core::analytics::AnalyticsReport;
use flm_core::{
    compute_analytics, find_matches, find_unmatched, match_details, run_full_analysis,
    AnalysisParams, FullAnalysis, MatchDetail, MatchReport, MatchThresholds, PersonClusterMatch,
};
use serde::Serialize;
use uuid::Uuid;

use super::{body_params, load_datasets, ApiResult};
use crate::AppState;

/// POST /api/matches/run
pub async fn run_matches(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<MatchReport>> {
    let thresholds: MatchThresholds = body_params(&body)?;
    thresholds.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(find_matches(&legacy, &modern, &thresholds)))
}

const PREVIEW_SIZE: usize = 10;

/// Counts plus the strongest applicable matches
#[derive(Debug, Serialize)]
pub struct MatchPreview {
    pub total_matches: usize,
    pub applicable_matches: usize,
    pub top_matches: Vec<PersonClusterMatch>,
    pub stats: MatchStats,
}

/// GET /api/matches/preview
///
/// Runs with the default thresholds.
pub async fn preview_matches(State(state): State<AppState>) -> ApiResult<Json<MatchPreview>> {
    let (legacy, modern) = load_datasets(&state).await?;
    let report = find_matches(&legacy, &modern, &MatchThresholds::default());

    Ok(Json(MatchPreview {
        total_matches: report.all_matches.len(),
        applicable_matches: report.applicable.len(),
        top_matches: report.applicable.into_iter().take(PREVIEW_SIZE).collect(),
        stats: report.stats,
    }))
}

/// One face match with the photo's path as seen from this machine
#[derive(Debug, Serialize)]
pub struct DetailView {
    #[serde(flatten)]
    pub detail: MatchDetail,
    pub local_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchDetailsResponse {
    pub legacy_person_id: i64,
    pub cluster_id: Uuid,
    pub total: usize,
    pub matches: Vec<DetailView>,
}

/// GET /api/matches/details/:person_id/:cluster_id
pub async fn get_match_details(
    State(state): State<AppState>,
    path: Result<Path<(i64, Uuid)>, PathRejection>,
    query: Result<Query<MatchThresholds>, QueryRejection>,
) -> ApiResult<Json<MatchDetailsResponse>> {
    let Path((person_id, cluster_id)) = path?;
    let Query(thresholds) = query?;
    thresholds.validate()?;

    let settings = state.settings.snapshot();
    let (legacy, modern) = load_datasets(&state).await?;

    let matches: Vec<DetailView> = match_details(&legacy, &modern, person_id, cluster_id, &thresholds)
        .into_iter()
        .map(|detail| DetailView {
            local_path: detail.original_path.as_deref().map(|p| settings.map_path(p)),
            detail,
        })
        .collect();

    Ok(Json(MatchDetailsResponse {
        legacy_person_id: person_id,
        cluster_id,
        total: matches.len(),
        matches,
    }))
}

/// GET /api/matches/unmatched
pub async fn get_unmatched(
    State(state): State<AppState>,
    query: Result<Query<MatchThresholds>, QueryRejection>,
) -> ApiResult<Json<UnmatchedReport>> {
    let Query(thresholds) = query?;
    thresholds.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    let report = find_matches(&legacy, &modern, &thresholds);
    Ok(Json(find_unmatched(&legacy, &report)))
}

/// GET /api/matches/analytics
pub async fn get_analytics(State(state): State<AppState>) -> ApiResult<Json<AnalyticsReport>> {
    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(compute_analytics(&legacy, &modern)))
}

/// POST /api/algorithm/run
pub async fn run_algorithm(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<FullAnalysis>> {
    let params: AnalysisParams = body_params(&body)?;
    params.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(run_full_analysis(&legacy, &modern, &params)?))
}

pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/api/matches/run", post(run_matches))
        .route("/api/matches/preview", get(preview_matches))
        .route("/api/matches/details/:person_id/:cluster_id", get(get_match_details))
        .route("/api/matches/unmatched", get(get_unmatched))
        .route("/api/matches/analytics", get(get_analytics))
        .route("/api/algorithm/run", post(run_algorithm))
}
