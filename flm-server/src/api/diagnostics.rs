//! Gap diagnostics endpoints

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use flm_core::diagnostics::{FaceComparisonReport, MissingPeopleReport, OrphanReport};
use flm_core::{compare_faces, find_missing_people, find_orphan_people};
use uuid::Uuid;

use super::{load_datasets, ApiResult};
use crate::db::legacy;
use crate::AppState;

/// GET /api/diagnostics/missing-people
pub async fn missing_people(State(state): State<AppState>) -> ApiResult<Json<MissingPeopleReport>> {
    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(find_missing_people(&legacy, &modern)))
}

/// GET /api/diagnostics/orphan-people
///
/// Needs only the legacy database.
pub async fn orphan_people(State(state): State<AppState>) -> ApiResult<Json<OrphanReport>> {
    let settings = state.settings.snapshot();
    let legacy = legacy::load_dataset(&settings.legacy_db).await?;
    Ok(Json(find_orphan_people(&legacy)))
}

/// GET /api/diagnostics/compare/:person_id/:asset_id
pub async fn compare(
    State(state): State<AppState>,
    path: Result<Path<(i64, Uuid)>, PathRejection>,
) -> ApiResult<Json<FaceComparisonReport>> {
    let Path((person_id, asset_id)) = path?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(compare_faces(&legacy, &modern, person_id, asset_id)))
}

pub fn diagnostic_routes() -> Router<AppState> {
    Router::new()
        .route("/api/diagnostics/missing-people", get(missing_people))
        .route("/api/diagnostics/orphan-people", get(orphan_people))
        .route("/api/diagnostics/compare/:person_id/:asset_id", get(compare))
}
