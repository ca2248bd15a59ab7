//! flm-server library: HTTP front end of the face label migration tool
//!
//! Every analysis request reloads both databases and runs the pure engine in
//! `flm-core`; write-back goes through the modern server's REST API.

use axum::Router;
use flm_common::config::SettingsContext;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod apply;
pub mod client;
pub mod db;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Bootstrap settings plus runtime overrides
    pub settings: SettingsContext,
    /// Connection pool for the modern server's REST API
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(settings: SettingsContext, http: reqwest::Client) -> Self {
        Self { settings, http }
    }

    /// REST client bound to the current API settings
    pub fn modern_client(&self) -> client::ModernClient {
        client::ModernClient::new(self.http.clone(), &self.settings.snapshot().modern_api)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::config_routes())
        .merge(api::match_routes())
        .merge(api::validation_routes())
        .merge(api::apply_routes())
        .merge(api::create_face_routes())
        .merge(api::diagnostic_routes())
        .merge(api::photo_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
