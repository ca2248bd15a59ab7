//! Unrecognized faces: labeled legacy faces the modern detector never found
//!
//! This is an existence check, not an assignment. A legacy face is recognized
//! when any modern face on the same photo, clustered or not, reaches `min_iou`.
//! Center distance and one-to-one exclusivity play no part.

use crate::coords::FaceRegion;
use crate::geometry::{iou, NormalizedRect};
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedFace {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub legacy_rect: NormalizedRect,
    pub asset_id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub image_width: i32,
    pub image_height: i32,
    /// Pixel region to submit to the modern face-creation endpoint
    pub region: FaceRegion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedPreview {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub existing_person_id: Option<Uuid>,
    pub existing_person_name: Option<String>,
    pub needs_person_creation: bool,
    pub face_count: usize,
    pub total_legacy_faces: usize,
    pub faces: Vec<UnrecognizedFace>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnrecognizedStats {
    pub total_people_with_unrecognized: usize,
    pub total_faces_to_create: usize,
    pub total_photos_with_unrecognized: usize,
    pub common_photos_checked: usize,
    pub people_needing_creation: usize,
    pub people_already_exist: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedReport {
    pub previews: Vec<UnrecognizedPreview>,
    pub stats: UnrecognizedStats,
}

/// Find legacy faces on imported photos with no overlapping modern face
///
/// A photo counts as imported when a modern image asset has the same photo key.
pub fn find_unrecognized_faces(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    min_iou: f64,
) -> UnrecognizedReport {
    let legacy_by_photo = legacy.faces_by_photo();
    let modern_by_photo = group_by_photo(&modern.faces);
    let assets = modern.assets_by_photo(true);
    let named = modern.named_people();

    let mut usable_faces: BTreeMap<i64, usize> = BTreeMap::new();
    for face in &legacy.faces {
        *usable_faces.entry(face.person_id).or_default() += 1;
    }

    let mut by_person: BTreeMap<i64, Vec<UnrecognizedFace>> = BTreeMap::new();
    let mut common_photos = 0usize;

    for (key, legacy_faces) in &legacy_by_photo {
        let Some(asset) = assets.get(key) else {
            continue;
        };
        common_photos += 1;

        let size = modern.image_size_of(asset);
        let modern_faces = modern_by_photo.get(key).map(Vec::as_slice).unwrap_or(&[]);

        for face in legacy_faces {
            let detected = modern_faces
                .iter()
                .any(|m| iou(&face.rect, &m.rect) >= min_iou);
            if detected {
                continue;
            }

            by_person
                .entry(face.person_id)
                .or_default()
                .push(UnrecognizedFace {
                    legacy_person_id: face.person_id,
                    legacy_person_name: face.person_name.clone(),
                    legacy_rect: face.rect,
                    asset_id: asset.id,
                    filename: face.filename.clone(),
                    file_size: key.filesize,
                    image_width: size.width,
                    image_height: size.height,
                    region: face.rect.to_face_region(size),
                });
        }
    }

    let mut previews: Vec<UnrecognizedPreview> = by_person
        .into_iter()
        .map(|(person_id, faces)| {
            let name = legacy
                .person_name(person_id)
                .map(str::to_string)
                .unwrap_or_else(|| faces[0].legacy_person_name.clone());
            let existing = named.get(name.as_str()).copied();
            UnrecognizedPreview {
                legacy_person_id: person_id,
                existing_person_name: existing.map(|_| name.clone()),
                legacy_person_name: name,
                existing_person_id: existing,
                needs_person_creation: existing.is_none(),
                face_count: faces.len(),
                total_legacy_faces: usable_faces.get(&person_id).copied().unwrap_or(0),
                faces,
            }
        })
        .collect();

    previews.sort_by(|a, b| b.face_count.cmp(&a.face_count));

    let photos: BTreeSet<(&str, i64)> = previews
        .iter()
        .flat_map(|p| p.faces.iter())
        .map(|f| (f.filename.as_str(), f.file_size))
        .collect();
    let people_needing_creation = previews.iter().filter(|p| p.needs_person_creation).count();

    let stats = UnrecognizedStats {
        total_people_with_unrecognized: previews.len(),
        total_faces_to_create: previews.iter().map(|p| p.face_count).sum(),
        total_photos_with_unrecognized: photos.len(),
        common_photos_checked: common_photos,
        people_needing_creation,
        people_already_exist: previews.len() - people_needing_creation,
    };

    info!(
        people = stats.total_people_with_unrecognized,
        faces = stats.total_faces_to_create,
        photos_checked = common_photos,
        "Unrecognized face search complete"
    );

    UnrecognizedReport { previews, stats }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedDetails {
    pub legacy_person_id: i64,
    pub legacy_person_name: Option<String>,
    pub total_faces: usize,
    pub faces: Vec<UnrecognizedFace>,
}

/// The unrecognized faces of one legacy person
pub fn unrecognized_details(report: &UnrecognizedReport, person_id: i64) -> UnrecognizedDetails {
    match report.previews.iter().find(|p| p.legacy_person_id == person_id) {
        Some(preview) => UnrecognizedDetails {
            legacy_person_id: person_id,
            legacy_person_name: Some(preview.legacy_person_name.clone()),
            total_faces: preview.faces.len(),
            faces: preview.faces.clone(),
        },
        None => UnrecognizedDetails {
            legacy_person_id: person_id,
            legacy_person_name: None,
            total_faces: 0,
            faces: Vec::new(),
        },
    }
}
