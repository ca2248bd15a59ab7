//! Unclustered faces: modern detections with no cluster that match a labeled legacy face

use crate::geometry::NormalizedRect;
use crate::matcher::{count_common, match_common_photos};
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use crate::params::MatchThresholds;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::info;
use uuid::Uuid;

const SAMPLE_FILENAMES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnclusteredFaceMatch {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub legacy_rect: NormalizedRect,
    pub face_id: Uuid,
    pub asset_id: Uuid,
    pub modern_rect: NormalizedRect,
    pub filename: String,
    pub file_size: i64,
    pub iou: f64,
    pub center_dist: f64,
}

/// What assigning one legacy person's unclustered matches would involve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnclusteredPreview {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    /// Modern person with exactly the same name, reused instead of created
    pub existing_person_id: Option<Uuid>,
    pub existing_person_name: Option<String>,
    pub needs_person_creation: bool,
    pub face_count: usize,
    pub total_legacy_faces: usize,
    pub avg_iou: f64,
    pub faces: Vec<UnclusteredFaceMatch>,
    pub sample_filenames: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnclusteredStats {
    pub total_legacy_people_with_matches: usize,
    pub total_faces_to_assign: usize,
    pub total_unclustered_faces: usize,
    pub common_photos_with_unclustered: usize,
    pub people_needing_creation: usize,
    pub people_already_exist: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnclusteredReport {
    pub previews: Vec<UnclusteredPreview>,
    pub stats: UnclusteredStats,
}

/// Match legacy faces against unclustered modern faces, grouped by legacy person
///
/// Previews are ordered by number of faces to assign, descending.
pub fn find_unclustered_matches(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    thresholds: &MatchThresholds,
) -> UnclusteredReport {
    let legacy_by_photo = legacy.faces_by_photo();
    let unclustered_by_photo = group_by_photo(modern.unclustered_faces());
    let named = modern.named_people();

    let mut usable_faces: BTreeMap<i64, usize> = BTreeMap::new();
    for face in &legacy.faces {
        *usable_faces.entry(face.person_id).or_default() += 1;
    }

    let mut by_person: BTreeMap<i64, Vec<UnclusteredFaceMatch>> = BTreeMap::new();
    for m in match_common_photos(&legacy_by_photo, &unclustered_by_photo, thresholds) {
        by_person
            .entry(m.legacy.person_id)
            .or_default()
            .push(UnclusteredFaceMatch {
                legacy_person_id: m.legacy.person_id,
                legacy_person_name: m.legacy.person_name.clone(),
                legacy_rect: m.legacy.rect,
                face_id: m.modern.face_id,
                asset_id: m.modern.asset_id,
                modern_rect: m.modern.rect,
                filename: m.legacy.filename.clone(),
                file_size: m.legacy.key.filesize,
                iou: m.iou,
                center_dist: m.center_dist,
            });
    }

    let mut previews: Vec<UnclusteredPreview> = by_person
        .into_iter()
        .map(|(person_id, faces)| {
            let name = legacy
                .person_name(person_id)
                .map(str::to_string)
                .unwrap_or_else(|| faces[0].legacy_person_name.clone());
            let existing = named.get(name.as_str()).copied();
            let avg_iou = faces.iter().map(|f| f.iou).sum::<f64>() / faces.len() as f64;

            let mut seen = HashSet::new();
            let sample_filenames = faces
                .iter()
                .map(|f| f.filename.clone())
                .filter(|f| seen.insert(f.clone()))
                .take(SAMPLE_FILENAMES)
                .collect();

            UnclusteredPreview {
                legacy_person_id: person_id,
                existing_person_name: existing.map(|_| name.clone()),
                legacy_person_name: name,
                existing_person_id: existing,
                needs_person_creation: existing.is_none(),
                face_count: faces.len(),
                total_legacy_faces: usable_faces.get(&person_id).copied().unwrap_or(0),
                avg_iou,
                faces,
                sample_filenames,
            }
        })
        .collect();

    previews.sort_by(|a, b| b.face_count.cmp(&a.face_count));

    let people_needing_creation = previews.iter().filter(|p| p.needs_person_creation).count();
    let stats = UnclusteredStats {
        total_legacy_people_with_matches: previews.len(),
        total_faces_to_assign: previews.iter().map(|p| p.face_count).sum(),
        total_unclustered_faces: unclustered_by_photo.values().map(Vec::len).sum(),
        common_photos_with_unclustered: count_common(&legacy_by_photo, &unclustered_by_photo),
        people_needing_creation,
        people_already_exist: previews.len() - people_needing_creation,
    };

    info!(
        people = stats.total_legacy_people_with_matches,
        faces = stats.total_faces_to_assign,
        "Unclustered matching complete"
    );

    UnclusteredReport { previews, stats }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnclusteredDetails {
    pub legacy_person_id: i64,
    /// `None` when the person has no unclustered matches
    pub legacy_person_name: Option<String>,
    pub total_matches: usize,
    pub matches: Vec<UnclusteredFaceMatch>,
}

/// The unclustered matches of one legacy person
pub fn unclustered_details(report: &UnclusteredReport, person_id: i64) -> UnclusteredDetails {
    match report.previews.iter().find(|p| p.legacy_person_id == person_id) {
        Some(preview) => UnclusteredDetails {
            legacy_person_id: person_id,
            legacy_person_name: Some(preview.legacy_person_name.clone()),
            total_matches: preview.faces.len(),
            matches: preview.faces.clone(),
        },
        None => UnclusteredDetails {
            legacy_person_id: person_id,
            legacy_person_name: None,
            total_matches: 0,
            matches: Vec::new(),
        },
    }
}
