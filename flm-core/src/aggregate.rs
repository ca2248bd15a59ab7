//! Person/cluster aggregation of accepted face matches
//!
//! Groups face matches by `(legacy person, modern cluster)` across all photos and
//! scores each group. Matches into unnamed clusters are the applicable ones: a
//! named cluster is considered already resolved.

use crate::matcher::{count_common, match_common_photos, FaceMatch};
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use crate::params::MatchThresholds;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::info;
use uuid::Uuid;

/// Sample photos kept per person/cluster match
const SAMPLE_PHOTOS: usize = 5;
/// Sample files kept per unmatched person
const SAMPLE_FILES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// `high` needs 5 matches averaging IoU ≥ 0.4, `medium` needs 2 averaging ≥ 0.35
    pub fn classify(face_matches: usize, avg_iou: f64) -> Self {
        if face_matches >= 5 && avg_iou >= 0.4 {
            Confidence::High
        } else if face_matches >= 2 && avg_iou >= 0.35 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Evidence that a legacy person and a modern cluster are the same individual
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonClusterMatch {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub cluster_id: Uuid,
    pub cluster_name: Option<String>,
    pub face_matches: usize,
    pub avg_iou: f64,
    pub avg_center_dist: f64,
    pub confidence: Confidence,
    pub sample_photos: Vec<String>,
}

impl PersonClusterMatch {
    pub fn is_applicable(&self) -> bool {
        self.cluster_name.is_none()
    }
}

/// Roll face matches up into ranked person/cluster matches
///
/// Ranked by match count, then average IoU, both descending.
pub fn aggregate(matches: &[FaceMatch<'_>]) -> Vec<PersonClusterMatch> {
    let mut groups: BTreeMap<(i64, Uuid), Vec<&FaceMatch<'_>>> = BTreeMap::new();
    for m in matches {
        if let Some(cluster_id) = m.modern.cluster_id {
            groups
                .entry((m.legacy.person_id, cluster_id))
                .or_default()
                .push(m);
        }
    }

    let mut results: Vec<PersonClusterMatch> = groups
        .into_iter()
        .map(|((person_id, cluster_id), group)| {
            let count = group.len();
            let avg_iou = group.iter().map(|m| m.iou).sum::<f64>() / count as f64;
            let avg_center_dist = group.iter().map(|m| m.center_dist).sum::<f64>() / count as f64;

            let mut seen = HashSet::new();
            let sample_photos = group
                .iter()
                .map(|m| m.legacy.filename.clone())
                .filter(|f| seen.insert(f.clone()))
                .take(SAMPLE_PHOTOS)
                .collect();

            PersonClusterMatch {
                legacy_person_id: person_id,
                legacy_person_name: group[0].legacy.person_name.clone(),
                cluster_id,
                cluster_name: group[0].modern.cluster_name.clone(),
                face_matches: count,
                avg_iou,
                avg_center_dist,
                confidence: Confidence::classify(count, avg_iou),
                sample_photos,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.face_matches
            .cmp(&a.face_matches)
            .then_with(|| b.avg_iou.total_cmp(&a.avg_iou))
    });
    results
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStats {
    pub legacy_people: usize,
    pub clusters: usize,
    pub legacy_photos_with_faces: usize,
    pub modern_photos_with_faces: usize,
    pub common_photos: usize,
    pub total_matches: usize,
    pub applicable_matches: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub all_matches: Vec<PersonClusterMatch>,
    pub applicable: Vec<PersonClusterMatch>,
    pub stats: MatchStats,
}

/// Match legacy people to modern clusters over every common photo
pub fn find_matches(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    thresholds: &MatchThresholds,
) -> MatchReport {
    let legacy_by_photo = legacy.faces_by_photo();
    let modern_by_photo = group_by_photo(modern.clustered_faces());

    let face_matches = match_common_photos(&legacy_by_photo, &modern_by_photo, thresholds);
    let all_matches = aggregate(&face_matches);
    let applicable: Vec<PersonClusterMatch> = all_matches
        .iter()
        .filter(|m| m.is_applicable())
        .cloned()
        .collect();

    let count_tier = |tier: Confidence| applicable.iter().filter(|m| m.confidence == tier).count();

    let stats = MatchStats {
        legacy_people: legacy
            .faces
            .iter()
            .map(|f| f.person_id)
            .collect::<BTreeSet<_>>()
            .len(),
        clusters: modern
            .clustered_faces()
            .filter_map(|f| f.cluster_id)
            .collect::<BTreeSet<_>>()
            .len(),
        legacy_photos_with_faces: legacy_by_photo.len(),
        modern_photos_with_faces: modern_by_photo.len(),
        common_photos: count_common(&legacy_by_photo, &modern_by_photo),
        total_matches: all_matches.len(),
        applicable_matches: applicable.len(),
        high_confidence: count_tier(Confidence::High),
        medium_confidence: count_tier(Confidence::Medium),
        low_confidence: count_tier(Confidence::Low),
    };

    info!(
        face_matches = face_matches.len(),
        person_cluster_matches = stats.total_matches,
        applicable = stats.applicable_matches,
        common_photos = stats.common_photos,
        "Matching complete"
    );

    MatchReport {
        all_matches,
        applicable,
        stats,
    }
}

/// Named legacy person absent from every person/cluster match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedPerson {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub face_count: usize,
    pub sample_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedStats {
    pub total_legacy_people: usize,
    pub matched_people: usize,
    pub unmatched_people: usize,
    /// Percentage of people with at least one match
    pub match_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedReport {
    pub unmatched: Vec<UnmatchedPerson>,
    pub stats: UnmatchedStats,
}

/// Legacy people with faces but no person/cluster match, most faces first
pub fn find_unmatched(legacy: &LegacyDataset, report: &MatchReport) -> UnmatchedReport {
    let matched: HashSet<i64> = report.all_matches.iter().map(|m| m.legacy_person_id).collect();

    let people_with_faces: Vec<_> = legacy.people.values().filter(|p| p.face_count > 0).collect();

    let mut unmatched: Vec<UnmatchedPerson> = people_with_faces
        .iter()
        .filter(|p| !matched.contains(&p.id))
        .map(|p| {
            let mut seen = HashSet::new();
            let sample_files = legacy
                .rows_of(p.id)
                .filter_map(|r| r.item_path())
                .filter(|path| seen.insert(path.clone()))
                .take(SAMPLE_FILES)
                .collect();
            UnmatchedPerson {
                legacy_person_id: p.id,
                legacy_person_name: p.name.clone(),
                face_count: p.face_count,
                sample_files,
            }
        })
        .collect();

    unmatched.sort_by(|a, b| b.face_count.cmp(&a.face_count));

    let total = people_with_faces.len();
    let matched_people = matched.len();
    let match_rate = if total > 0 {
        matched_people as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    UnmatchedReport {
        stats: UnmatchedStats {
            total_legacy_people: total,
            matched_people,
            unmatched_people: unmatched.len(),
            match_rate,
        },
        unmatched,
    }
}
