//! Gap diagnostics for legacy people that never made it to the modern system

use crate::coords::LegacyRect;
use crate::geometry::{center_distance, iou, NormalizedRect};
use crate::model::{LegacyDataset, ModernDataset};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// People examined in detail per diagnostics run
pub const MAX_PEOPLE_ANALYZED: usize = 50;
/// Face rows examined per person
pub const PHOTOS_PER_PERSON: usize = 20;
const SAMPLE_PHOTOS: usize = 5;

/// Most likely reason a legacy person has no modern counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    NoPhotos,
    NotImported,
    NoFacesDetected,
    PartialDetection,
    ThresholdMismatch,
}

impl Diagnosis {
    pub fn classify(photos_checked: usize, in_modern: usize, with_faces: usize) -> Self {
        if photos_checked == 0 {
            Diagnosis::NoPhotos
        } else if in_modern == 0 {
            Diagnosis::NotImported
        } else if with_faces == 0 {
            Diagnosis::NoFacesDetected
        } else if with_faces < in_modern {
            Diagnosis::PartialDetection
        } else {
            Diagnosis::ThresholdMismatch
        }
    }

    pub fn describe(&self, in_modern: usize, with_faces: usize) -> String {
        match self {
            Diagnosis::NoPhotos => "No photos found for this person in the legacy database".to_string(),
            Diagnosis::NotImported => "None of the photos exist in the modern system; photos not imported".to_string(),
            Diagnosis::NoFacesDetected => {
                "Photos exist in the modern system but no faces were detected".to_string()
            }
            Diagnosis::PartialDetection => format!(
                "Faces detected in only {}/{} photos; partial face detection",
                with_faces, in_modern
            ),
            Diagnosis::ThresholdMismatch => {
                "Photos exist and have detected faces; likely an IoU or threshold mismatch".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoDiagnostic {
    pub filename: String,
    pub filesize: i64,
    pub folder_path: Option<String>,
    pub exists_in_modern: bool,
    pub asset_id: Option<Uuid>,
    pub modern_faces_detected: usize,
    pub legacy_rect: Option<LegacyRect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingPerson {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub total_legacy_faces: usize,
    pub photos_checked: usize,
    pub photos_in_modern: usize,
    pub photos_not_in_modern: usize,
    pub photos_with_modern_faces: usize,
    pub sample_photos: Vec<PhotoDiagnostic>,
    pub diagnosis: Diagnosis,
    pub diagnosis_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissingSummary {
    pub photos_not_in_modern: usize,
    pub no_face_detection: usize,
    pub partial_detection: usize,
    pub threshold_mismatch: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingPeopleReport {
    pub total_missing: usize,
    pub analyzed: usize,
    pub summary: MissingSummary,
    pub people: Vec<MissingPerson>,
}

/// Legacy people whose name, case-insensitively, matches no modern person
///
/// People are taken most faces first; only the first [`MAX_PEOPLE_ANALYZED`] are
/// examined, each through its first [`PHOTOS_PER_PERSON`] face rows.
pub fn find_missing_people(legacy: &LegacyDataset, modern: &ModernDataset) -> MissingPeopleReport {
    let modern_names: HashSet<String> = modern
        .clusters
        .values()
        .filter_map(|c| c.name.as_deref())
        .map(str::to_lowercase)
        .collect();
    let assets = modern.assets_by_photo(false);

    let mut missing: Vec<_> = legacy
        .people
        .values()
        .filter(|p| p.face_count > 0 && !modern_names.contains(&p.name.to_lowercase()))
        .collect();
    missing.sort_by(|a, b| b.face_count.cmp(&a.face_count));

    let mut people = Vec::new();
    for person in missing.iter().take(MAX_PEOPLE_ANALYZED) {
        let mut photos_checked = 0;
        let mut in_modern = 0;
        let mut not_in_modern = 0;
        let mut with_faces = 0;
        let mut sample_photos = Vec::new();

        for row in legacy.rows_of(person.id).take(PHOTOS_PER_PERSON) {
            let Some(key) = crate::photo::PhotoKey::new(row.filename.as_deref(), row.filesize) else {
                continue;
            };
            photos_checked += 1;

            let asset_id = assets.get(&key).map(|a| a.id);
            let faces_detected = asset_id
                .and_then(|id| modern.asset_face_counts.get(&id).copied())
                .unwrap_or(0);

            if asset_id.is_some() {
                in_modern += 1;
                if faces_detected > 0 {
                    with_faces += 1;
                }
            } else {
                not_in_modern += 1;
            }

            if sample_photos.len() < SAMPLE_PHOTOS {
                sample_photos.push(PhotoDiagnostic {
                    filename: row.filename.clone().unwrap_or_default(),
                    filesize: key.filesize,
                    folder_path: row.folder_path.clone(),
                    exists_in_modern: asset_id.is_some(),
                    asset_id,
                    modern_faces_detected: faces_detected,
                    legacy_rect: row.rect(),
                });
            }
        }

        let diagnosis = Diagnosis::classify(photos_checked, in_modern, with_faces);
        people.push(MissingPerson {
            legacy_person_id: person.id,
            legacy_person_name: person.name.clone(),
            total_legacy_faces: person.face_count,
            photos_checked,
            photos_in_modern: in_modern,
            photos_not_in_modern: not_in_modern,
            photos_with_modern_faces: with_faces,
            sample_photos,
            diagnosis,
            diagnosis_message: diagnosis.describe(in_modern, with_faces),
        });
    }

    let summary = MissingSummary {
        photos_not_in_modern: people.iter().filter(|p| p.photos_in_modern == 0).count(),
        no_face_detection: people
            .iter()
            .filter(|p| p.photos_in_modern > 0 && p.photos_with_modern_faces == 0)
            .count(),
        partial_detection: people
            .iter()
            .filter(|p| p.photos_with_modern_faces > 0 && p.photos_with_modern_faces < p.photos_in_modern)
            .count(),
        threshold_mismatch: people
            .iter()
            .filter(|p| p.photos_with_modern_faces > 0 && p.photos_with_modern_faces >= p.photos_in_modern)
            .count(),
    };

    MissingPeopleReport {
        total_missing: missing.len(),
        analyzed: people.len(),
        summary,
        people,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanPerson {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub historical_item_count: i64,
    pub has_cluster: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanStats {
    pub orphan_count: usize,
    pub with_faces_count: usize,
    pub total_historical_items_lost: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanReport {
    pub orphan_people: Vec<OrphanPerson>,
    pub total_named_people: usize,
    pub stats: OrphanStats,
}

/// Named legacy people with no face rows left, highest historical item count first
pub fn find_orphan_people(legacy: &LegacyDataset) -> OrphanReport {
    let mut orphans: Vec<OrphanPerson> = legacy
        .people
        .values()
        .filter(|p| p.face_count == 0)
        .map(|p| OrphanPerson {
            legacy_person_id: p.id,
            legacy_person_name: p.name.clone(),
            historical_item_count: p.item_count,
            has_cluster: p.has_cluster,
        })
        .collect();
    orphans.sort_by(|a, b| b.historical_item_count.cmp(&a.historical_item_count));

    let stats = OrphanStats {
        orphan_count: orphans.len(),
        with_faces_count: legacy.people.len() - orphans.len(),
        total_historical_items_lost: orphans.iter().map(|o| o.historical_item_count).sum(),
    };

    OrphanReport {
        total_named_people: legacy.people.len(),
        orphan_people: orphans,
        stats,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceComparison {
    pub legacy_name: String,
    pub legacy_rect: NormalizedRect,
    pub modern_face_id: Uuid,
    pub modern_name: Option<String>,
    pub modern_rect: NormalizedRect,
    pub iou: f64,
    pub center_dist: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceComparisonReport {
    pub legacy_faces_count: usize,
    pub modern_faces_count: usize,
    pub comparisons: Vec<FaceComparison>,
}

/// Every pairwise score between one legacy person's faces and one asset's faces
///
/// No thresholds and no photo restriction on the legacy side.
pub fn compare_faces(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    person_id: i64,
    asset_id: Uuid,
) -> FaceComparisonReport {
    let legacy_faces: Vec<_> = legacy.faces.iter().filter(|f| f.person_id == person_id).collect();
    let modern_faces: Vec<_> = modern.faces.iter().filter(|f| f.asset_id == asset_id).collect();

    let mut comparisons = Vec::with_capacity(legacy_faces.len() * modern_faces.len());
    for l in &legacy_faces {
        for m in &modern_faces {
            comparisons.push(FaceComparison {
                legacy_name: l.person_name.clone(),
                legacy_rect: l.rect,
                modern_face_id: m.face_id,
                modern_name: m.cluster_name.clone(),
                modern_rect: m.rect,
                iou: iou(&l.rect, &m.rect),
                center_dist: center_distance(&l.rect, &m.rect),
            });
        }
    }

    FaceComparisonReport {
        legacy_faces_count: legacy_faces.len(),
        modern_faces_count: modern_faces.len(),
        comparisons,
    }
}
