//! Tunable analysis parameters
//!
//! These four values are the only knobs affecting analysis outcomes. They arrive
//! with each request and are validated before any data is loaded.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_IOU: f64 = 0.3;
pub const DEFAULT_MAX_CENTER_DIST: f64 = 0.4;
pub const DEFAULT_MIN_FACES: usize = 3;
pub const DEFAULT_MIN_MATCHES: usize = 2;

/// Thresholds a candidate face pair must satisfy, both at once
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    #[serde(default = "default_min_iou")]
    pub min_iou: f64,
    #[serde(default = "default_max_center_dist")]
    pub max_center_dist: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            min_iou: DEFAULT_MIN_IOU,
            max_center_dist: DEFAULT_MAX_CENTER_DIST,
        }
    }
}

impl MatchThresholds {
    pub fn new(min_iou: f64, max_center_dist: f64) -> Self {
        Self {
            min_iou,
            max_center_dist,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_min_iou(self.min_iou)?;
        if self.max_center_dist.is_nan() || self.max_center_dist < 0.0 {
            return Err(CoreError::InvalidParams {
                name: "max_center_dist",
                reason: format!("must be a non-negative number, got {}", self.max_center_dist),
            });
        }
        Ok(())
    }

    /// Conjunctive acceptance test
    pub fn accepts(&self, iou: f64, center_dist: f64) -> bool {
        iou >= self.min_iou && center_dist <= self.max_center_dist
    }
}

/// Full parameter set for the analyses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    #[serde(default = "default_min_iou")]
    pub min_iou: f64,
    #[serde(default = "default_max_center_dist")]
    pub max_center_dist: f64,
    /// Smallest cluster examined by cluster validation
    #[serde(default = "default_min_faces")]
    pub min_faces: usize,
    /// Matched faces needed before a cluster counts toward a merge candidate
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            min_iou: DEFAULT_MIN_IOU,
            max_center_dist: DEFAULT_MAX_CENTER_DIST,
            min_faces: DEFAULT_MIN_FACES,
            min_matches: DEFAULT_MIN_MATCHES,
        }
    }
}

impl AnalysisParams {
    pub fn thresholds(&self) -> MatchThresholds {
        MatchThresholds::new(self.min_iou, self.max_center_dist)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.thresholds().validate()?;
        if self.min_faces == 0 {
            return Err(CoreError::InvalidParams {
                name: "min_faces",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_matches == 0 {
            return Err(CoreError::InvalidParams {
                name: "min_matches",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// `min_iou` must lie in [0, 1]
pub fn validate_min_iou(min_iou: f64) -> CoreResult<()> {
    if (0.0..=1.0).contains(&min_iou) {
        Ok(())
    } else {
        Err(CoreError::InvalidParams {
            name: "min_iou",
            reason: format!("must be within [0, 1], got {}", min_iou),
        })
    }
}

fn default_min_iou() -> f64 {
    DEFAULT_MIN_IOU
}

fn default_max_center_dist() -> f64 {
    DEFAULT_MAX_CENTER_DIST
}

fn default_min_faces() -> usize {
    DEFAULT_MIN_FACES
}

fn default_min_matches() -> usize {
    DEFAULT_MIN_MATCHES
}
