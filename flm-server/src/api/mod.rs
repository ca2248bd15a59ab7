//! HTTP API handlers for flm-server

pub mod apply;
pub mod config;
pub mod create_faces;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod matches;
pub mod photos;
pub mod validation;

pub use apply::apply_routes;
pub use config::config_routes;
pub use create_faces::create_face_routes;
pub use diagnostics::diagnostic_routes;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use matches::match_routes;
pub use photos::photo_routes;
pub use validation::validation_routes;

use crate::AppState;
use axum::body::Bytes;
use flm_core::{LegacyDataset, ModernDataset};
use serde::de::DeserializeOwned;

/// Parse an optional JSON body; an empty body means all defaults
pub(crate) fn body_params<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Reload both datasets with the current settings
pub(crate) async fn load_datasets(state: &AppState) -> ApiResult<(LegacyDataset, ModernDataset)> {
    let settings = state.settings.snapshot();
    Ok(crate::db::load_datasets(&settings).await?)
}
