//! Endpoints for legacy faces the modern detector missed

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use flm_core::params::{validate_min_iou, DEFAULT_MIN_IOU};
use flm_core::unrecognized::UnrecognizedDetails;
use flm_core::{find_unrecognized_faces, unrecognized_details, UnrecognizedReport};
use serde::Deserialize;

use super::{body_params, load_datasets, ApiError, ApiResult};
use crate::apply::{create_faces, CreateFacesReport, CreateFacesRequest};
use crate::AppState;

/// Only the IoU bar applies to the detection check
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MinIouParams {
    #[serde(default = "default_min_iou")]
    pub min_iou: f64,
}

impl Default for MinIouParams {
    fn default() -> Self {
        Self {
            min_iou: DEFAULT_MIN_IOU,
        }
    }
}

fn default_min_iou() -> f64 {
    DEFAULT_MIN_IOU
}

/// POST /api/create-faces/preview
pub async fn preview_unrecognized(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<UnrecognizedReport>> {
    let params: MinIouParams = body_params(&body)?;
    validate_min_iou(params.min_iou)?;

    let (legacy, modern) = load_datasets(&state).await?;
    Ok(Json(find_unrecognized_faces(&legacy, &modern, params.min_iou)))
}

/// GET /api/create-faces/details/:person_id
pub async fn get_unrecognized_details(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<MinIouParams>, QueryRejection>,
) -> ApiResult<Json<UnrecognizedDetails>> {
    let Path(person_id) = path?;
    let Query(params) = query?;
    validate_min_iou(params.min_iou)?;

    let (legacy, modern) = load_datasets(&state).await?;
    let report = find_unrecognized_faces(&legacy, &modern, params.min_iou);
    Ok(Json(unrecognized_details(&report, person_id)))
}

/// POST /api/create-faces/apply
pub async fn apply_create_faces(
    State(state): State<AppState>,
    payload: Result<Json<CreateFacesRequest>, JsonRejection>,
) -> ApiResult<Json<CreateFacesReport>> {
    let Json(request) = payload?;
    if request.person_name.trim().is_empty() {
        return Err(ApiError::BadRequest("person_name must not be empty".to_string()));
    }
    if let Some(face) = request
        .faces
        .iter()
        .find(|f| f.width <= 0 || f.height <= 0 || f.image_width <= 0 || f.image_height <= 0)
    {
        return Err(ApiError::BadRequest(format!(
            "Face on asset {} has a non-positive size",
            face.asset_id
        )));
    }

    let client = state.modern_client();
    Ok(Json(create_faces(&client, &request).await))
}

pub fn create_face_routes() -> Router<AppState> {
    Router::new()
        .route("/api/create-faces/preview", post(preview_unrecognized))
        .route("/api/create-faces/details/:person_id", get(get_unrecognized_details))
        .route("/api/create-faces/apply", post(apply_create_faces))
}
