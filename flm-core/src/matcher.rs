//! Greedy one-to-one face matching
//!
//! Every analysis that needs a face correspondence goes through [`assign`]:
//! 1. Score the full cross product of legacy × modern faces on one photo.
//! 2. Keep pairs with `iou >= min_iou` and `center_dist <= max_center_dist`.
//! 3. Stable sort by IoU, highest first; ties keep enumeration order
//!    (legacy index outer, modern index inner).
//! 4. Accept a pair only when neither face was consumed by an earlier pair.
//!
//! This is a greedy assignment, not a globally optimal one.

use crate::geometry::{center_distance, iou};
use crate::model::{FaceRect, LegacyFace, ModernFace};
use crate::params::MatchThresholds;
use crate::photo::PhotoKey;
use std::collections::BTreeMap;
use tracing::warn;

/// Cross products above this size are logged as pathological photos
pub const LARGE_PHOTO_PAIRS: usize = 10_000;

/// Accepted pairing of two faces, by index into the inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePair {
    pub legacy_idx: usize,
    pub modern_idx: usize,
    pub iou: f64,
    pub center_dist: f64,
}

/// Compute the greedy 1:1 assignment between two sets of faces on one photo
pub fn assign<L: FaceRect, M: FaceRect>(
    legacy: &[L],
    modern: &[M],
    thresholds: &MatchThresholds,
) -> Vec<FacePair> {
    let pairs = legacy.len().saturating_mul(modern.len());
    if pairs > LARGE_PHOTO_PAIRS {
        warn!(
            legacy_faces = legacy.len(),
            modern_faces = modern.len(),
            "Unusually many faces on one photo"
        );
    }

    let mut candidates = Vec::new();
    for (legacy_idx, l) in legacy.iter().enumerate() {
        for (modern_idx, m) in modern.iter().enumerate() {
            let overlap = iou(l.rect(), m.rect());
            let dist = center_distance(l.rect(), m.rect());
            if thresholds.accepts(overlap, dist) {
                candidates.push(FacePair {
                    legacy_idx,
                    modern_idx,
                    iou: overlap,
                    center_dist: dist,
                });
            }
        }
    }

    // sort_by is stable
    candidates.sort_by(|a, b| b.iou.total_cmp(&a.iou));

    let mut legacy_used = vec![false; legacy.len()];
    let mut modern_used = vec![false; modern.len()];
    let mut accepted = Vec::new();

    for pair in candidates {
        if legacy_used[pair.legacy_idx] || modern_used[pair.modern_idx] {
            continue;
        }
        legacy_used[pair.legacy_idx] = true;
        modern_used[pair.modern_idx] = true;
        accepted.push(pair);
    }

    accepted
}

/// Accepted match between a legacy face and a modern face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMatch<'a> {
    pub legacy: &'a LegacyFace,
    pub modern: &'a ModernFace,
    pub iou: f64,
    pub center_dist: f64,
}

/// Match the faces of one photo
pub fn match_photo<'a>(
    legacy: &[&'a LegacyFace],
    modern: &[&'a ModernFace],
    thresholds: &MatchThresholds,
) -> Vec<FaceMatch<'a>> {
    assign(legacy, modern, thresholds)
        .into_iter()
        .map(|pair| FaceMatch {
            legacy: legacy[pair.legacy_idx],
            modern: modern[pair.modern_idx],
            iou: pair.iou,
            center_dist: pair.center_dist,
        })
        .collect()
}

/// Match every photo present on both sides, in photo key order
///
/// Photos present on only one side contribute nothing.
pub fn match_common_photos<'a>(
    legacy: &BTreeMap<PhotoKey, Vec<&'a LegacyFace>>,
    modern: &BTreeMap<PhotoKey, Vec<&'a ModernFace>>,
    thresholds: &MatchThresholds,
) -> Vec<FaceMatch<'a>> {
    let mut matches = Vec::new();
    for (key, legacy_faces) in legacy {
        if let Some(modern_faces) = modern.get(key) {
            matches.extend(match_photo(legacy_faces, modern_faces, thresholds));
        }
    }
    matches
}

/// Number of photo keys present in both groupings
pub fn count_common<A, B>(a: &BTreeMap<PhotoKey, A>, b: &BTreeMap<PhotoKey, B>) -> usize {
    a.keys().filter(|k| b.contains_key(*k)).count()
}
