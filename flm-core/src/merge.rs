//! Merge candidates: legacy people whose faces are split across several clusters

use crate::matcher::match_common_photos;
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use crate::params::MatchThresholds;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeCluster {
    pub cluster_id: Uuid,
    pub cluster_name: Option<String>,
    pub matched_faces: usize,
    pub total_faces: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeCandidate {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub total_legacy_faces: usize,
    /// Qualifying clusters, most matched faces first
    pub clusters: Vec<MergeCluster>,
    /// Matched faces over the person's legacy faces, capped at 1.0
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeSummary {
    pub people_with_split_clusters: usize,
    pub total_clusters_to_merge: usize,
    pub potential_faces_affected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub total_legacy_people_analyzed: usize,
    pub merge_candidates: Vec<MergeCandidate>,
    pub potential_faces_to_merge: usize,
    pub summary: MergeSummary,
}

/// Find legacy people matching more than one cluster with at least `min_matches` faces each
///
/// Faces of hidden clusters are left out. Candidates are ordered by number of
/// clusters, then confidence, both descending.
pub fn find_merge_candidates(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    thresholds: &MatchThresholds,
    min_matches: usize,
) -> MergeReport {
    let legacy_by_photo = legacy.faces_by_photo();
    let modern_by_photo = group_by_photo(modern.clustered_faces().filter(|f| {
        f.cluster_id
            .and_then(|id| modern.clusters.get(&id))
            .map_or(true, |c| !c.is_hidden)
    }));

    let mut usable_faces: BTreeMap<i64, usize> = BTreeMap::new();
    for face in &legacy.faces {
        *usable_faces.entry(face.person_id).or_default() += 1;
    }

    let mut mapping: BTreeMap<i64, BTreeMap<Uuid, usize>> = BTreeMap::new();
    for m in match_common_photos(&legacy_by_photo, &modern_by_photo, thresholds) {
        if let Some(cluster_id) = m.modern.cluster_id {
            *mapping
                .entry(m.legacy.person_id)
                .or_default()
                .entry(cluster_id)
                .or_default() += 1;
        }
    }

    let mut candidates = Vec::new();
    let mut potential_faces = 0usize;

    for (person_id, per_cluster) in mapping {
        let mut clusters: Vec<MergeCluster> = per_cluster
            .into_iter()
            .filter(|(_, count)| *count >= min_matches)
            .map(|(cluster_id, matched_faces)| {
                let cluster = modern.clusters.get(&cluster_id);
                MergeCluster {
                    cluster_id,
                    cluster_name: cluster.and_then(|c| c.name.clone()),
                    matched_faces,
                    total_faces: cluster.map_or(0, |c| c.face_count),
                }
            })
            .collect();

        if clusters.len() < 2 {
            continue;
        }

        clusters.sort_by(|a, b| b.matched_faces.cmp(&a.matched_faces));
        potential_faces += clusters.iter().map(|c| c.total_faces).sum::<usize>();

        let total_legacy_faces = usable_faces.get(&person_id).copied().unwrap_or(0);
        let matched: usize = clusters.iter().map(|c| c.matched_faces).sum();
        let confidence = if total_legacy_faces > 0 {
            (matched as f64 / total_legacy_faces as f64).min(1.0)
        } else {
            0.0
        };

        candidates.push(MergeCandidate {
            legacy_person_id: person_id,
            legacy_person_name: legacy.person_name(person_id).unwrap_or_default().to_string(),
            total_legacy_faces,
            clusters,
            confidence,
        });
    }

    candidates.sort_by(|a, b| {
        b.clusters
            .len()
            .cmp(&a.clusters.len())
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });

    let summary = MergeSummary {
        people_with_split_clusters: candidates.len(),
        total_clusters_to_merge: candidates.iter().map(|c| c.clusters.len()).sum(),
        potential_faces_affected: potential_faces,
    };

    info!(
        candidates = summary.people_with_split_clusters,
        clusters = summary.total_clusters_to_merge,
        "Merge analysis complete"
    );

    MergeReport {
        total_legacy_people_analyzed: usable_faces.len(),
        merge_candidates: candidates,
        potential_faces_to_merge: potential_faces,
        summary,
    }
}
