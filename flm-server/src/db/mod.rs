//! Database access layer for flm-server
//!
//! Both databases are opened read-only and reloaded on every analysis request.

pub mod legacy;
pub mod modern;

use flm_common::config::Settings;
use flm_common::Result;
use flm_core::{LegacyDataset, ModernDataset};
use tracing::info;

/// Load both datasets for one analysis run
pub async fn load_datasets(settings: &Settings) -> Result<(LegacyDataset, ModernDataset)> {
    let legacy = legacy::load_dataset(&settings.legacy_db).await?;
    let modern = modern::load_dataset(&settings.modern_db).await?;

    info!(
        legacy_faces = legacy.faces.len(),
        modern_faces = modern.faces.len(),
        "Datasets loaded"
    );

    Ok((legacy, modern))
}
