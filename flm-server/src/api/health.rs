//! Health check and connection status endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::db::{legacy, modern};
use crate::AppState;

/// Health check response: status, module name and version
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "flm-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Outcome of one connection test
#[derive(Debug, Serialize)]
pub struct ConnectionStatus<T> {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<Result<T, String>> for ConnectionStatus<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(stats) => Self {
                connected: true,
                stats: Some(stats),
                error: None,
            },
            Err(error) => Self {
                connected: false,
                stats: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub legacy_db: ConnectionStatus<legacy::LegacyStats>,
    pub modern_db: ConnectionStatus<modern::ModernStats>,
    pub modern_api: ConnectionStatus<()>,
}

/// GET /api/status
///
/// Always 200; failures are reported per connection.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let settings = state.settings.snapshot();
    let client = state.modern_client();

    let (legacy_db, modern_db, api) = tokio::join!(
        legacy::test_connection(&settings.legacy_db),
        modern::test_connection(&settings.modern_db),
        client.ping(),
    );

    Json(StatusResponse {
        legacy_db: legacy_db.into(),
        modern_db: modern_db.into(),
        modern_api: api.map_err(|e| e.to_string()).into(),
    })
}

/// Dataset statistics, null for a source that cannot be reached
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub legacy_db: Option<legacy::LegacyStats>,
    pub modern_db: Option<modern::ModernStats>,
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let settings = state.settings.snapshot();

    let (legacy_db, modern_db) = tokio::join!(
        legacy::test_connection(&settings.legacy_db),
        modern::test_connection(&settings.modern_db),
    );

    Json(StatsResponse {
        legacy_db: legacy_db.ok(),
        modern_db: modern_db.ok(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/status", get(status))
        .route("/api/stats", get(stats))
}
