//! Runtime configuration endpoints
//!
//! Updates change the in-memory overrides only; nothing is written to disk.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use flm_common::config::{EffectiveConfig, ModernDbUpdate};
use serde::Deserialize;
use std::path::PathBuf;

use super::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LegacyDbUpdate {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ModernApiUpdate {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<EffectiveConfig> {
    Json(state.settings.effective_view())
}

/// POST /api/config/legacy-db
///
/// The file must exist; it is opened read-only on the next analysis.
pub async fn set_legacy_db(
    State(state): State<AppState>,
    payload: Result<Json<LegacyDbUpdate>, JsonRejection>,
) -> ApiResult<Json<EffectiveConfig>> {
    let Json(update) = payload?;
    if !update.path.is_file() {
        return Err(ApiError::BadRequest(format!(
            "Legacy database not found: {}",
            update.path.display()
        )));
    }
    state.settings.set_legacy_db(update.path);
    Ok(Json(state.settings.effective_view()))
}

/// POST /api/config/modern-api
pub async fn set_modern_api(
    State(state): State<AppState>,
    payload: Result<Json<ModernApiUpdate>, JsonRejection>,
) -> ApiResult<Json<EffectiveConfig>> {
    let Json(update) = payload?;
    if let Some(url) = &update.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::BadRequest(format!("Not an http(s) URL: {}", url)));
        }
    }
    state.settings.set_modern_api(update.url, update.api_key);
    Ok(Json(state.settings.effective_view()))
}

/// POST /api/config/modern-db
pub async fn set_modern_db(
    State(state): State<AppState>,
    payload: Result<Json<ModernDbUpdate>, JsonRejection>,
) -> ApiResult<Json<EffectiveConfig>> {
    let Json(update) = payload?;
    state.settings.set_modern_db(update);
    Ok(Json(state.settings.effective_view()))
}

pub fn config_routes() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/config/legacy-db", post(set_legacy_db))
        .route("/api/config/modern-api", post(set_modern_api))
        .route("/api/config/modern-db", post(set_modern_db))
}
