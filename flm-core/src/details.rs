//! Per-photo face matches behind one person/cluster match, for overlay review

use crate::geometry::NormalizedRect;
use crate::matcher::match_common_photos;
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use crate::params::MatchThresholds;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDetail {
    pub filename: String,
    pub asset_id: Uuid,
    pub original_path: Option<String>,
    pub folder_path: Option<String>,
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub legacy_rect: NormalizedRect,
    pub cluster_id: Uuid,
    pub cluster_name: Option<String>,
    pub modern_rect: NormalizedRect,
    pub iou: f64,
    pub center_dist: f64,
    pub image_width: i32,
    pub image_height: i32,
    pub file_size: i64,
}

/// Accepted face matches between one legacy person and one cluster, best IoU first
///
/// The matcher sees only that person's faces and that cluster's faces, so the
/// result can differ from the global run when other faces compete on a photo.
pub fn match_details(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    person_id: i64,
    cluster_id: Uuid,
    thresholds: &MatchThresholds,
) -> Vec<MatchDetail> {
    let legacy_by_photo = group_by_photo(legacy.faces.iter().filter(|f| f.person_id == person_id));
    let modern_by_photo = group_by_photo(
        modern
            .faces
            .iter()
            .filter(|f| f.cluster_id == Some(cluster_id)),
    );

    let mut details: Vec<MatchDetail> = match_common_photos(&legacy_by_photo, &modern_by_photo, thresholds)
        .into_iter()
        .map(|m| MatchDetail {
            filename: m.legacy.filename.clone(),
            asset_id: m.modern.asset_id,
            original_path: m.modern.original_path.clone(),
            folder_path: m.legacy.folder_path.clone(),
            legacy_person_id: person_id,
            legacy_person_name: m.legacy.person_name.clone(),
            legacy_rect: m.legacy.rect,
            cluster_id,
            cluster_name: m.modern.cluster_name.clone(),
            modern_rect: m.modern.rect,
            iou: m.iou,
            center_dist: m.center_dist,
            image_width: m.modern.image.width,
            image_height: m.modern.image.height,
            file_size: m.modern.key.filesize,
        })
        .collect();

    details.sort_by(|a, b| b.iou.total_cmp(&a.iou));
    details
}
