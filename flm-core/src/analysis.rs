//! Every analysis in one pass over a single pair of loaded datasets

use crate::aggregate::{find_matches, PersonClusterMatch};
use crate::analytics::{compute_analytics, AnalyticsReport};
use crate::error::CoreResult;
use crate::merge::{find_merge_candidates, MergeCandidate};
use crate::model::{LegacyDataset, ModernDataset};
use crate::params::AnalysisParams;
use crate::unclustered::{find_unclustered_matches, UnclusteredPreview};
use crate::validation::{validate_clusters, ClusterIssue};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSection {
    pub all: Vec<PersonClusterMatch>,
    pub applicable: Vec<PersonClusterMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedStats {
    pub total_matches: usize,
    pub applicable_matches: usize,
    pub unclustered_people: usize,
    pub unclustered_faces: usize,
    pub merge_candidates: usize,
    pub validation_errors: usize,
    pub validation_warnings: usize,
    pub common_photos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullAnalysis {
    pub analytics: AnalyticsReport,
    pub matches: MatchSection,
    pub unclustered: Vec<UnclusteredPreview>,
    pub merge_candidates: Vec<MergeCandidate>,
    pub validation_issues: Vec<ClusterIssue>,
    pub stats: CombinedStats,
    pub thresholds: AnalysisParams,
}

/// Run analytics, matching, unclustered, merge and validation with one parameter set
pub fn run_full_analysis(
    legacy: &LegacyDataset,
    modern: &ModernDataset,
    params: &AnalysisParams,
) -> CoreResult<FullAnalysis> {
    params.validate()?;
    let thresholds = params.thresholds();

    let analytics = compute_analytics(legacy, modern);
    let matches = find_matches(legacy, modern, &thresholds);
    let unclustered = find_unclustered_matches(legacy, modern, &thresholds);
    let merge = find_merge_candidates(legacy, modern, &thresholds, params.min_matches);
    let validation = validate_clusters(legacy, modern, &thresholds, params.min_faces);

    let stats = CombinedStats {
        total_matches: matches.stats.total_matches,
        applicable_matches: matches.stats.applicable_matches,
        unclustered_people: unclustered.stats.total_legacy_people_with_matches,
        unclustered_faces: unclustered.stats.total_faces_to_assign,
        merge_candidates: merge.merge_candidates.len(),
        validation_errors: validation.summary.errors,
        validation_warnings: validation.summary.warnings,
        common_photos: matches.stats.common_photos,
    };

    info!(
        matches = stats.total_matches,
        unclustered = stats.unclustered_people,
        merges = stats.merge_candidates,
        issues = validation.issues.len(),
        "Full analysis complete"
    );

    Ok(FullAnalysis {
        analytics,
        matches: MatchSection {
            all: matches.all_matches,
            applicable: matches.applicable,
        },
        unclustered: unclustered.previews,
        merge_candidates: merge.merge_candidates,
        validation_issues: validation.issues,
        stats,
        thresholds: *params,
    })
}
