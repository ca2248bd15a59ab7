//! Image proxies for the modern server, so the API key never reaches a browser

use axum::{
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, ApiResult};
use crate::client::Image;
use crate::AppState;

const SIZES: [&str; 3] = ["preview", "thumbnail", "fullsize"];

#[derive(Debug, Deserialize)]
pub struct SizeQuery {
    pub size: Option<String>,
}

fn image_response(image: Image) -> Response {
    (
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "max-age=3600".to_string()),
        ],
        image.bytes,
    )
        .into_response()
}

/// GET /api/photos/modern/:asset_id?size=preview|thumbnail|fullsize
pub async fn modern_photo(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<SizeQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(asset_id) = path?;
    let Query(query) = query?;
    let size = query.size.as_deref().unwrap_or("preview");
    if !SIZES.contains(&size) {
        return Err(ApiError::BadRequest(format!(
            "size must be one of {}",
            SIZES.join(", ")
        )));
    }

    let image = state.modern_client().asset_thumbnail(asset_id, size).await?;
    Ok(image_response(image))
}

/// GET /api/thumbnails/modern/:person_id
pub async fn modern_person_thumbnail(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Response> {
    let Path(person_id) = path?;
    let image = state.modern_client().person_thumbnail(person_id).await?;
    Ok(image_response(image))
}

pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/photos/modern/:asset_id", get(modern_photo))
        .route("/api/thumbnails/modern/:person_id", get(modern_person_thumbnail))
}
