//! Distribution analytics over unfiltered face pairs and threshold suggestion
//!
//! Every legacy/clustered-modern pair sharing a photo with any overlap is scored,
//! with no thresholds and no exclusivity. The same statistics run on IoU and on
//! center distance through one generic set of functions.

use crate::geometry::{center_distance, iou};
use crate::matcher::count_common;
use crate::model::{group_by_photo, LegacyDataset, ModernDataset};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

pub const HISTOGRAM_BINS: usize = 20;
/// Returned by [`suggest_threshold`] when the sample is too small
pub const DEFAULT_SUGGESTED_THRESHOLD: f64 = 0.3;
const MIN_SAMPLES_FOR_SUGGESTION: usize = 10;
const CUT_POINTS: usize = 100;
pub const CUMULATIVE_THRESHOLDS: [f64; 8] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];

/// One scored face pair, unfiltered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawPair {
    pub legacy_person_id: i64,
    pub legacy_person_name: String,
    pub cluster_id: Uuid,
    pub cluster_name: Option<String>,
    pub iou: f64,
    pub center_dist: f64,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    /// Bin centers
    pub bins: Vec<f64>,
    pub counts: Vec<usize>,
    /// `bins + 1` edges
    pub edges: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Same statistic for both metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerMetric<T> {
    pub iou: T,
    pub center_dist: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeAbove {
    pub thresholds: Vec<f64>,
    pub percent_above: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeBelow {
    pub thresholds: Vec<f64>,
    pub percent_below: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cumulative {
    /// Share of pairs with IoU ≥ each threshold
    pub iou: CumulativeAbove,
    /// Share of pairs with center distance ≤ each threshold
    pub center_dist: CumulativeBelow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsStats {
    pub total_raw_pairs: usize,
    pub common_photos: usize,
    pub legacy_people: usize,
    pub legacy_unique_names: usize,
    pub clusters: usize,
    pub cluster_unique_names: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub raw_pairs: Vec<RawPair>,
    pub histograms: PerMetric<Histogram>,
    pub percentiles: PerMetric<Option<Percentiles>>,
    pub suggested_thresholds: PerMetric<f64>,
    pub cumulative: Cumulative,
    pub stats: AnalyticsStats,
}

/// Equal-width histogram between the sample's min and max
///
/// A constant sample uses a bin width of 1, putting every value in the first bin.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    if values.is_empty() || bins == 0 {
        return Histogram::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let edges: Vec<f64> = (0..=bins).map(|i| min + i as f64 * width).collect();
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = ((v - min) / width) as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    let centers = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();

    Histogram {
        bins: centers,
        counts,
        edges,
    }
}

/// Nearest-rank percentiles (`sorted[floor(n * p)]`), plus min, max and mean
pub fn percentiles(values: &[f64]) -> Option<Percentiles> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let n = sorted.len();
    let at = |p: f64| sorted[((n as f64 * p) as usize).min(n - 1)];

    Some(Percentiles {
        p5: at(0.05),
        p25: at(0.25),
        p50: at(0.50),
        p75: at(0.75),
        p95: at(0.95),
        min: sorted[0],
        max: sorted[n - 1],
        mean: sorted.iter().sum::<f64>() / n as f64,
    })
}

/// Suggest a separating threshold by minimizing within-class variance
///
/// Candidate cuts are `sorted[n * i / 100]` for `i` in `1..min(100, n - 1)`, so
/// small samples only try their lowest ranks. Each cut splits the sample into
/// `<= cut` and `> cut`; the cut with the lowest size-weighted sum of class
/// variances wins, and ties keep the earlier cut.
/// Samples with fewer than 10 values return [`DEFAULT_SUGGESTED_THRESHOLD`].
pub fn suggest_threshold(values: &[f64]) -> f64 {
    if values.len() < MIN_SAMPLES_FOR_SUGGESTION {
        return DEFAULT_SUGGESTED_THRESHOLD;
    }

    let sorted = sorted(values);
    let n = sorted.len();
    let mut best_threshold = sorted[n / 2];
    let mut best_variance = f64::INFINITY;

    for i in 1..CUT_POINTS.min(n - 1) {
        let threshold = sorted[n * i / CUT_POINTS];
        // Sorted, so the lower class is a prefix
        let split = sorted.partition_point(|v| *v <= threshold);
        let (lower, upper) = sorted.split_at(split);
        if lower.is_empty() || upper.is_empty() {
            continue;
        }

        let within = lower.len() as f64 / n as f64 * variance(lower)
            + upper.len() as f64 / n as f64 * variance(upper);

        if within < best_variance {
            best_variance = within;
            best_threshold = threshold;
        }
    }

    best_threshold
}

/// Percentage of values at or above each threshold
pub fn percent_at_or_above(values: &[f64], thresholds: &[f64]) -> Vec<f64> {
    percent_where(values, thresholds, |v, t| v >= t)
}

/// Percentage of values at or below each threshold
pub fn percent_at_or_below(values: &[f64], thresholds: &[f64]) -> Vec<f64> {
    percent_where(values, thresholds, |v, t| v <= t)
}

fn percent_where(values: &[f64], thresholds: &[f64], keep: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    thresholds
        .iter()
        .map(|&t| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().filter(|&&v| keep(v, t)).count() as f64 / values.len() as f64 * 100.0
            }
        })
        .collect()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Score every overlapping legacy/clustered-modern pair on common photos
pub fn compute_analytics(legacy: &LegacyDataset, modern: &ModernDataset) -> AnalyticsReport {
    let legacy_by_photo = legacy.faces_by_photo();
    let modern_by_photo = group_by_photo(modern.clustered_faces());

    let mut raw_pairs = Vec::new();
    for (key, legacy_faces) in &legacy_by_photo {
        let Some(modern_faces) = modern_by_photo.get(key) else {
            continue;
        };
        for l in legacy_faces {
            for m in modern_faces {
                let overlap = iou(&l.rect, &m.rect);
                if overlap <= 0.0 {
                    continue;
                }
                if let Some(cluster_id) = m.cluster_id {
                    raw_pairs.push(RawPair {
                        legacy_person_id: l.person_id,
                        legacy_person_name: l.person_name.clone(),
                        cluster_id,
                        cluster_name: m.cluster_name.clone(),
                        iou: overlap,
                        center_dist: center_distance(&l.rect, &m.rect),
                        filename: key.filename.clone(),
                    });
                }
            }
        }
    }

    let ious: Vec<f64> = raw_pairs.iter().map(|p| p.iou).collect();
    let dists: Vec<f64> = raw_pairs.iter().map(|p| p.center_dist).collect();

    let stats = AnalyticsStats {
        total_raw_pairs: raw_pairs.len(),
        common_photos: count_common(&legacy_by_photo, &modern_by_photo),
        legacy_people: legacy.faces.iter().map(|f| f.person_id).collect::<BTreeSet<_>>().len(),
        legacy_unique_names: legacy
            .faces
            .iter()
            .map(|f| f.person_name.as_str())
            .collect::<BTreeSet<_>>()
            .len(),
        clusters: modern
            .clustered_faces()
            .filter_map(|f| f.cluster_id)
            .collect::<BTreeSet<_>>()
            .len(),
        cluster_unique_names: modern
            .clustered_faces()
            .filter_map(|f| f.cluster_name.as_deref())
            .collect::<BTreeSet<_>>()
            .len(),
    };

    info!(pairs = raw_pairs.len(), common_photos = stats.common_photos, "Analytics computed");

    AnalyticsReport {
        histograms: PerMetric {
            iou: histogram(&ious, HISTOGRAM_BINS),
            center_dist: histogram(&dists, HISTOGRAM_BINS),
        },
        percentiles: PerMetric {
            iou: percentiles(&ious),
            center_dist: percentiles(&dists),
        },
        suggested_thresholds: PerMetric {
            iou: round3(suggest_threshold(&ious)),
            center_dist: round3(suggest_threshold(&dists)),
        },
        cumulative: Cumulative {
            iou: CumulativeAbove {
                thresholds: CUMULATIVE_THRESHOLDS.to_vec(),
                percent_above: percent_at_or_above(&ious, &CUMULATIVE_THRESHOLDS),
            },
            center_dist: CumulativeBelow {
                thresholds: CUMULATIVE_THRESHOLDS.to_vec(),
                percent_below: percent_at_or_below(&dists, &CUMULATIVE_THRESHOLDS),
            },
        },
        raw_pairs,
        stats,
    }
}
