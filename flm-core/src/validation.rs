//! Cluster validation: modern clusters whose faces map to several legacy people

use crate::matcher::match_common_photos;
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use crate::params::MatchThresholds;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

const SAMPLE_PHOTOS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The cluster mixes two or more legacy people
    Error,
    /// One legacy person, but fewer than half the cluster's faces matched
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedLegacyPerson {
    pub person_id: i64,
    pub person_name: String,
    pub face_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterIssue {
    pub cluster_id: Uuid,
    pub cluster_name: Option<String>,
    pub total_faces_in_cluster: usize,
    pub matched_faces: usize,
    /// Legacy people whose faces landed in this cluster, most faces first
    pub legacy_people_matched: Vec<MatchedLegacyPerson>,
    pub severity: Severity,
    /// Filenames of up to five matched photos
    pub sample_photos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
    pub total_checked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_clusters_checked: usize,
    pub clusters_with_issues: usize,
    pub clusters_ok: usize,
    pub issues: Vec<ClusterIssue>,
    pub summary: ValidationSummary,
}

/// Check every visible cluster with at least `min_faces` faces
///
/// Each cluster's faces are matched against all legacy faces on the same photos.
/// Issues are ordered errors first, then by number of legacy people, descending.
pub fn validate_clusters(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    thresholds: &MatchThresholds,
    min_faces: usize,
) -> ValidationReport {
    let legacy_by_photo = legacy.faces_by_photo();

    let mut clusters: Vec<_> = modern
        .clusters
        .values()
        .filter(|c| !c.is_hidden && c.face_count >= min_faces)
        .collect();
    clusters.sort_by(|a, b| b.face_count.cmp(&a.face_count));

    let mut issues = Vec::new();
    let mut clusters_ok = 0usize;

    for cluster in &clusters {
        let modern_by_photo = group_by_photo(
            modern
                .faces
                .iter()
                .filter(|f| f.cluster_id == Some(cluster.id)),
        );
        let matches = match_common_photos(&legacy_by_photo, &modern_by_photo, thresholds);

        let mut people: BTreeMap<i64, MatchedLegacyPerson> = BTreeMap::new();
        for m in &matches {
            people
                .entry(m.legacy.person_id)
                .or_insert_with(|| MatchedLegacyPerson {
                    person_id: m.legacy.person_id,
                    person_name: m.legacy.person_name.clone(),
                    face_count: 0,
                })
                .face_count += 1;
        }

        let matched_faces = matches.len();
        let severity = match people.len() {
            0 => None,
            1 if (matched_faces as f64) < cluster.face_count as f64 * 0.5 => Some(Severity::Warning),
            1 => None,
            _ => Some(Severity::Error),
        };

        let Some(severity) = severity else {
            clusters_ok += 1;
            continue;
        };

        let mut legacy_people_matched: Vec<MatchedLegacyPerson> = people.into_values().collect();
        legacy_people_matched.sort_by(|a, b| b.face_count.cmp(&a.face_count));

        issues.push(ClusterIssue {
            cluster_id: cluster.id,
            cluster_name: cluster.name.clone(),
            total_faces_in_cluster: cluster.face_count,
            matched_faces,
            legacy_people_matched,
            severity,
            sample_photos: matches
                .iter()
                .take(SAMPLE_PHOTOS)
                .map(|m| m.modern.filename.clone())
                .collect(),
        });
    }

    issues.sort_by(|a, b| {
        let rank = |i: &ClusterIssue| if i.severity == Severity::Error { 0 } else { 1 };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| b.legacy_people_matched.len().cmp(&a.legacy_people_matched.len()))
    });

    let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warnings = issues.len() - errors;

    info!(
        checked = clusters.len(),
        errors, warnings, "Cluster validation complete"
    );

    ValidationReport {
        total_clusters_checked: clusters.len(),
        clusters_with_issues: issues.len(),
        clusters_ok,
        summary: ValidationSummary {
            errors,
            warnings,
            total_checked: clusters.len(),
        },
        issues,
    }
}
