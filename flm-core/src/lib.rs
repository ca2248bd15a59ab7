//! # FLM Core
//!
//! Face-label migration engine: joins a legacy face-tagging database and a modern
//! photo library by photo, matches face rectangles between them and derives
//! person/cluster correspondences and the follow-up analyses built on them.
//!
//! Everything here is pure and synchronous. Storage and network access live in
//! `flm-server`, which hands the rows over as [`LegacyDataset`] and [`ModernDataset`].

pub mod aggregate;
pub mod analysis;
pub mod analytics;
pub mod coords;
pub mod details;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod params;
pub mod photo;
pub mod unclustered;
pub mod unrecognized;
pub mod validation;

pub use aggregate::{find_matches, find_unmatched, Confidence, MatchReport, PersonClusterMatch};
pub use analysis::{run_full_analysis, FullAnalysis};
pub use analytics::{compute_analytics, AnalyticsReport};
pub use coords::{FaceRegion, ImageSize, LegacyRect, PixelBox};
pub use details::{match_details, MatchDetail};
pub use diagnostics::{compare_faces, find_missing_people, find_orphan_people};
pub use error::{CoreError, CoreResult};
pub use geometry::{center_distance, iou, NormalizedRect};
pub use merge::{find_merge_candidates, MergeReport};
pub use model::{
    LegacyDataset, LegacyFaceRow, LegacyPersonRow, ModernAssetRow, ModernClusterRow, ModernDataset,
    ModernFaceRow,
};
pub use params::{AnalysisParams, MatchThresholds};
pub use photo::PhotoKey;
pub use unclustered::{find_unclustered_matches, unclustered_details, UnclusteredReport};
pub use unrecognized::{find_unrecognized_faces, unrecognized_details, UnrecognizedReport};
pub use validation::{validate_clusters, Severity, ValidationReport};
