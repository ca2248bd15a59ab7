//! Name write-back and unclustered face assignment endpoints

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use flm_core::unclustered::UnclusteredDetails;
use flm_core::{find_unclustered_matches, unclustered_details, MatchThresholds, UnclusteredReport};

use super::{body_params, load_datasets, ApiError, ApiResult};
use crate::apply::{
    apply_names, apply_unclustered, ApplyNamesReport, ApplyNamesRequest, ApplyUnclusteredReport,
    ApplyUnclusteredRequest,
};
use crate::AppState;

/// POST /api/apply
pub async fn apply_matches(
    State(state): State<AppState>,
    payload: Result<Json<ApplyNamesRequest>, JsonRejection>,
) -> ApiResult<Json<ApplyNamesReport>> {
    let Json(request) = payload?;
    let client = state.modern_client();
    Ok(Json(apply_names(&client, &request).await))
}

/// POST /api/apply/unclustered/preview
pub async fn preview_unclustered(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<UnclusteredReport>> {
    let thresholds: MatchThresholds = body_params(&body)?;
    thresholds.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(find_unclustered_matches(&legacy, &modern, &thresholds)))
}

/// GET /api/apply/unclustered/details/:person_id
pub async fn get_unclustered_details(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<MatchThresholds>, QueryRejection>,
) -> ApiResult<Json<UnclusteredDetails>> {
    let Path(person_id) = path?;
    let Query(thresholds) = query?;
    thresholds.validate()?;

    let (legacy, modern) = load_datasets(&state).await?;
    let report = find_unclustered_matches(&legacy, &modern, &thresholds);
    Ok(Json(unclustered_details(&report, person_id)))
}

/// POST /api/apply/unclustered
pub async fn apply_unclustered_faces(
    State(state): State<AppState>,
    payload: Result<Json<ApplyUnclusteredRequest>, JsonRejection>,
) -> ApiResult<Json<ApplyUnclusteredReport>> {
    let Json(request) = payload?;
    if request.items.iter().any(|item| item.person_name.trim().is_empty()) {
        return Err(ApiError::BadRequest("Every item needs a person name".to_string()));
    }
    let client = state.modern_client();
    Ok(Json(apply_unclustered(&client, &request).await))
}

pub fn apply_routes() -> Router<AppState> {
    Router::new()
        .route("/api/apply", post(apply_matches))
        .route("/api/apply/unclustered/preview", post(preview_unclustered))
        .route("/api/apply/unclustered/details/:person_id", get(get_unclustered_details))
        .route("/api/apply/unclustered", post(apply_unclustered_faces))
}
