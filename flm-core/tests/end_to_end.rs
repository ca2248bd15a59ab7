//! End-to-end behavior of the analyses over small synthetic libraries

use flm_core::diagnostics::Diagnosis;
use flm_core::{
    compare_faces, find_matches, find_merge_candidates, find_missing_people, find_orphan_people,
    find_unclustered_matches, find_unmatched, find_unrecognized_faces, match_details,
    run_full_analysis, unclustered_details, validate_clusters, AnalysisParams, Confidence,
    LegacyDataset, LegacyFaceRow, LegacyPersonRow, MatchThresholds, ModernAssetRow,
    ModernClusterRow, ModernDataset, ModernFaceRow, Severity,
};
use uuid::Uuid;

const IMAGE: i32 = 100;

/// Legacy face covering pixels (25,25)-(50,50) of a 100×100 photo
fn legacy_face(person_id: i64, name: &str, file: &str) -> LegacyFaceRow {
    legacy_face_at(person_id, name, file, 0.5, 0.25, 0.25, 0.25)
}

fn legacy_face_at(
    person_id: i64,
    name: &str,
    file: &str,
    top: f64,
    left: f64,
    width: f64,
    height: f64,
) -> LegacyFaceRow {
    LegacyFaceRow {
        person_id,
        person_name: name.to_string(),
        filename: Some(file.to_string()),
        filesize: Some(size_of(file)),
        folder_path: Some("D:/Photos".to_string()),
        rect_top: Some(top),
        rect_left: Some(left),
        rect_width: Some(width),
        rect_height: Some(height),
    }
}

/// Modern face at pixels (25,25)-(50,50), identical to [`legacy_face`]
fn modern_face(asset: u128, cluster: Option<u128>, name: Option<&str>, file: &str) -> ModernFaceRow {
    modern_face_at(asset, cluster, name, file, (25, 25, 50, 50))
}

fn modern_face_at(
    asset: u128,
    cluster: Option<u128>,
    name: Option<&str>,
    file: &str,
    (x1, y1, x2, y2): (i32, i32, i32, i32),
) -> ModernFaceRow {
    ModernFaceRow {
        face_id: Uuid::new_v4(),
        asset_id: Uuid::from_u128(asset),
        person_id: cluster.map(Uuid::from_u128),
        person_name: name.map(str::to_string),
        filename: Some(file.to_string()),
        filesize: Some(size_of(file)),
        original_path: Some(format!("/library/{}", file)),
        x1: Some(x1),
        y1: Some(y1),
        x2: Some(x2),
        y2: Some(y2),
        image_width: Some(IMAGE),
        image_height: Some(IMAGE),
    }
}

fn asset(id: u128, file: &str) -> ModernAssetRow {
    ModernAssetRow {
        id: Uuid::from_u128(id),
        filename: Some(file.to_string()),
        filesize: Some(size_of(file)),
        original_path: Some(format!("/library/{}", file)),
        exif_width: Some(IMAGE),
        exif_height: Some(IMAGE),
        is_image: true,
    }
}

fn size_of(file: &str) -> i64 {
    1000 + file.len() as i64
}

fn legacy(rows: Vec<LegacyFaceRow>) -> LegacyDataset {
    LegacyDataset::from_rows(rows, vec![])
}

fn modern(rows: Vec<ModernFaceRow>) -> ModernDataset {
    ModernDataset::from_rows(rows, vec![], vec![])
}

fn photo(i: usize) -> String {
    format!("IMG_{:04}.jpg", i)
}

#[test]
fn test_five_identical_faces_give_high_applicable_match() {
    let files: Vec<String> = (0..5).map(photo).collect();
    let legacy = legacy(files.iter().map(|f| legacy_face(1, "Alice", f)).collect());
    let modern = modern(
        files
            .iter()
            .enumerate()
            .map(|(i, f)| modern_face(i as u128, Some(77), None, f))
            .collect(),
    );

    let report = find_matches(&legacy, &modern, &MatchThresholds::default());

    assert_eq!(report.all_matches.len(), 1);
    let m = &report.all_matches[0];
    assert_eq!(m.legacy_person_name, "Alice");
    assert_eq!(m.cluster_id, Uuid::from_u128(77));
    assert_eq!(m.face_matches, 5);
    assert!((m.avg_iou - 1.0).abs() < 1e-9);
    assert_eq!(m.confidence, Confidence::High);
    assert_eq!(report.applicable.len(), 1, "unnamed cluster is applicable");
    assert_eq!(report.stats.common_photos, 5);
    assert_eq!(report.stats.high_confidence, 1);
}

#[test]
fn test_named_cluster_is_not_applicable() {
    let legacy = legacy(vec![legacy_face(1, "Alice", "a.jpg")]);
    let modern = modern(vec![modern_face(1, Some(5), Some("Alice"), "a.jpg")]);

    let report = find_matches(&legacy, &modern, &MatchThresholds::default());

    assert_eq!(report.all_matches.len(), 1);
    assert!(report.applicable.is_empty());
}

#[test]
fn test_one_modern_face_is_claimed_once() {
    // Two legacy faces stacked on the same modern face
    let legacy = legacy(vec![
        legacy_face(1, "Alice", "a.jpg"),
        legacy_face(2, "Bob", "a.jpg"),
    ]);
    let modern = modern(vec![modern_face(1, Some(5), None, "a.jpg")]);

    let report = find_matches(&legacy, &modern, &MatchThresholds::default());

    let total: usize = report.all_matches.iter().map(|m| m.face_matches).sum();
    assert_eq!(total, 1);
    assert_eq!(report.all_matches[0].legacy_person_name, "Alice", "ties keep load order");
}

#[test]
fn test_photo_key_needs_same_size() {
    let legacy = legacy(vec![legacy_face(1, "Alice", "a.jpg")]);
    let mut row = modern_face(1, Some(5), None, "A.JPG");
    row.filesize = Some(1);
    let modern = modern(vec![row]);

    let report = find_matches(&legacy, &modern, &MatchThresholds::default());

    assert_eq!(report.stats.common_photos, 0);
    assert!(report.all_matches.is_empty());
}

#[test]
fn test_filename_case_is_ignored() {
    let legacy = legacy(vec![legacy_face(1, "Alice", "a.jpg")]);
    let mut row = modern_face(1, Some(5), None, "A.JPG");
    row.filesize = Some(size_of("a.jpg"));
    let modern = modern(vec![row]);

    let report = find_matches(&legacy, &modern, &MatchThresholds::default());

    assert_eq!(report.stats.common_photos, 1);
    assert_eq!(report.all_matches.len(), 1);
}

#[test]
fn test_results_are_deterministic() {
    let files: Vec<String> = (0..12).map(photo).collect();
    let mut legacy_rows = Vec::new();
    let mut modern_rows = Vec::new();
    for (i, f) in files.iter().enumerate() {
        legacy_rows.push(legacy_face(1 + (i % 3) as i64, ["Ann", "Ben", "Cid"][i % 3], f));
        modern_rows.push(modern_face(i as u128, Some(100 + (i % 2) as u128), None, f));
    }
    let legacy = legacy(legacy_rows);
    let modern = modern(modern_rows);
    let params = AnalysisParams::default();

    let first = run_full_analysis(&legacy, &modern, &params).expect("valid params");
    let second = run_full_analysis(&legacy, &modern, &params).expect("valid params");

    assert_eq!(first, second);
}

#[test]
fn test_cluster_with_two_people_is_an_error() {
    let files: Vec<String> = (0..4).map(photo).collect();
    let legacy = legacy(vec![
        legacy_face(1, "Alice", &files[0]),
        legacy_face(1, "Alice", &files[1]),
        legacy_face(2, "Bob", &files[2]),
        legacy_face(2, "Bob", &files[3]),
    ]);
    let modern = modern(
        files
            .iter()
            .enumerate()
            .map(|(i, f)| modern_face(i as u128, Some(9), None, f))
            .collect(),
    );

    let report = validate_clusters(&legacy, &modern, &MatchThresholds::default(), 3);

    assert_eq!(report.total_clusters_checked, 1);
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.legacy_people_matched.len(), 2);
    assert_eq!(issue.matched_faces, 4);
    assert_eq!(report.summary.errors, 1);
}

#[test]
fn test_cluster_with_weak_coverage_is_a_warning() {
    let files: Vec<String> = (0..10).map(photo).collect();
    let legacy = legacy(vec![
        legacy_face(1, "Alice", &files[0]),
        legacy_face(1, "Alice", &files[1]),
    ]);
    let modern = modern(
        files
            .iter()
            .enumerate()
            .map(|(i, f)| modern_face(i as u128, Some(9), None, f))
            .collect(),
    );

    let report = validate_clusters(&legacy, &modern, &MatchThresholds::default(), 3);

    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].severity, Severity::Warning);
    assert_eq!(report.summary.warnings, 1);
}

#[test]
fn test_small_and_hidden_clusters_are_skipped() {
    let legacy = legacy(vec![
        legacy_face(1, "Alice", "a.jpg"),
        legacy_face(2, "Bob", "b.jpg"),
    ]);
    let modern = ModernDataset::from_rows(
        vec![
            modern_face(1, Some(9), None, "a.jpg"),
            modern_face(2, Some(9), None, "b.jpg"),
        ],
        vec![ModernClusterRow {
            id: Uuid::from_u128(9),
            name: None,
            is_hidden: true,
            face_count: 2,
        }],
        vec![],
    );

    let report = validate_clusters(&legacy, &modern, &MatchThresholds::default(), 1);
    assert_eq!(report.total_clusters_checked, 0, "hidden cluster skipped");

    let visible = self::modern(vec![
        modern_face(1, Some(9), None, "a.jpg"),
        modern_face(2, Some(9), None, "b.jpg"),
    ]);
    let report = validate_clusters(&legacy, &visible, &MatchThresholds::default(), 3);
    assert_eq!(report.total_clusters_checked, 0, "below min_faces");
}

#[test]
fn test_person_split_over_two_clusters_is_one_merge_candidate() {
    let files: Vec<String> = (0..4).map(photo).collect();
    let legacy = legacy(files.iter().map(|f| legacy_face(1, "Alice", f)).collect());
    let modern = modern(vec![
        modern_face(0, Some(10), None, &files[0]),
        modern_face(1, Some(10), None, &files[1]),
        modern_face(2, Some(20), None, &files[2]),
        modern_face(3, Some(20), None, &files[3]),
    ]);

    let report = find_merge_candidates(&legacy, &modern, &MatchThresholds::default(), 2);

    assert_eq!(report.merge_candidates.len(), 1);
    let candidate = &report.merge_candidates[0];
    assert_eq!(candidate.legacy_person_name, "Alice");
    let mut ids: Vec<Uuid> = candidate.clusters.iter().map(|c| c.cluster_id).collect();
    ids.sort();
    assert_eq!(ids, vec![Uuid::from_u128(10), Uuid::from_u128(20)]);
    assert!((candidate.confidence - 1.0).abs() < 1e-9);

    let strict = find_merge_candidates(&legacy, &modern, &MatchThresholds::default(), 3);
    assert!(strict.merge_candidates.is_empty());
}

#[test]
fn test_unclustered_faces_preview_person_creation() {
    let legacy = legacy(vec![
        legacy_face(1, "Alice", "a.jpg"),
        legacy_face(2, "Bob", "b.jpg"),
    ]);
    let modern = modern(vec![
        modern_face(1, None, None, "a.jpg"),
        modern_face(2, None, None, "b.jpg"),
        modern_face(3, Some(50), Some("Bob"), "c.jpg"),
    ]);

    let report = find_unclustered_matches(&legacy, &modern, &MatchThresholds::default());

    assert_eq!(report.previews.len(), 2);
    assert_eq!(report.stats.total_faces_to_assign, 2);
    assert_eq!(report.stats.people_needing_creation, 1);
    assert_eq!(report.stats.people_already_exist, 1);

    let bob = report
        .previews
        .iter()
        .find(|p| p.legacy_person_name == "Bob")
        .expect("Bob preview");
    assert_eq!(bob.existing_person_id, Some(Uuid::from_u128(50)));
    assert!(!bob.needs_person_creation);

    let details = unclustered_details(&report, 1);
    assert_eq!(details.total_matches, 1);
    assert_eq!(details.legacy_person_name.as_deref(), Some("Alice"));

    let absent = unclustered_details(&report, 42);
    assert_eq!(absent.total_matches, 0);
    assert!(absent.legacy_person_name.is_none());
}

#[test]
fn test_unrecognized_boundary_is_inclusive() {
    // Legacy (0,0)-(0.5,0.5) against modern (0,0)-(0.5,0.25): IoU exactly 0.5
    let legacy = legacy(vec![legacy_face_at(1, "Alice", "a.jpg", 0.5, 0.0, 0.5, 0.5)]);
    let modern = ModernDataset::from_rows(
        vec![modern_face_at(1, None, None, "a.jpg", (0, 0, 50, 25))],
        vec![],
        vec![asset(1, "a.jpg")],
    );

    let at_boundary = find_unrecognized_faces(&legacy, &modern, 0.5);
    assert!(at_boundary.previews.is_empty(), "IoU equal to min_iou counts as detected");

    let above = find_unrecognized_faces(&legacy, &modern, 0.51);
    assert_eq!(above.previews.len(), 1);
    let face = &above.previews[0].faces[0];
    assert_eq!(face.asset_id, Uuid::from_u128(1));
    assert_eq!((face.region.x, face.region.y), (0, 0));
    assert_eq!((face.region.width, face.region.height), (50, 50));
}

#[test]
fn test_unrecognized_needs_an_imported_asset() {
    let legacy = legacy(vec![legacy_face(1, "Alice", "a.jpg")]);
    let modern = ModernDataset::from_rows(vec![], vec![], vec![]);

    let report = find_unrecognized_faces(&legacy, &modern, 0.3);

    assert!(report.previews.is_empty());
    assert_eq!(report.stats.common_photos_checked, 0);
}

#[test]
fn test_unrecognized_uses_exif_size_without_faces() {
    let legacy = legacy(vec![legacy_face(1, "Alice", "a.jpg")]);
    let mut row = asset(1, "a.jpg");
    row.exif_width = Some(200);
    row.exif_height = Some(400);
    let modern = ModernDataset::from_rows(vec![], vec![], vec![row]);

    let report = find_unrecognized_faces(&legacy, &modern, 0.3);

    let face = &report.previews[0].faces[0];
    assert_eq!((face.image_width, face.image_height), (200, 400));
    assert_eq!((face.region.x, face.region.y), (50, 100));
}

#[test]
fn test_unmatched_people_and_match_details() {
    let legacy = legacy(vec![
        legacy_face(1, "Alice", "a.jpg"),
        legacy_face(2, "Bob", "b.jpg"),
    ]);
    let modern = modern(vec![modern_face(1, Some(5), None, "a.jpg")]);
    let thresholds = MatchThresholds::default();

    let report = find_matches(&legacy, &modern, &thresholds);
    let unmatched = find_unmatched(&legacy, &report);
    assert_eq!(unmatched.unmatched.len(), 1);
    assert_eq!(unmatched.unmatched[0].legacy_person_name, "Bob");
    assert_eq!(unmatched.unmatched[0].sample_files, vec!["D:/Photos/b.jpg".to_string()]);

    let details = match_details(&legacy, &modern, 1, Uuid::from_u128(5), &thresholds);
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].asset_id, Uuid::from_u128(1));
    assert_eq!(details[0].image_width, IMAGE);
}

#[test]
fn test_missing_people_diagnosis() {
    let legacy = legacy(vec![
        legacy_face(1, "Alice", "a.jpg"),
        legacy_face(2, "Carol", "c.jpg"),
    ]);
    let modern = ModernDataset::from_rows(
        vec![modern_face(1, Some(5), Some("alice"), "a.jpg")],
        vec![],
        vec![asset(1, "a.jpg")],
    );

    let report = find_missing_people(&legacy, &modern);

    assert_eq!(report.total_missing, 1, "name lookup ignores case");
    let carol = &report.people[0];
    assert_eq!(carol.legacy_person_name, "Carol");
    assert_eq!(carol.diagnosis, Diagnosis::NotImported);
    assert_eq!(report.summary.photos_not_in_modern, 1);
}

#[test]
fn test_orphans_and_comparison() {
    let legacy = LegacyDataset::from_rows(
        vec![legacy_face(1, "Alice", "a.jpg")],
        vec![
            LegacyPersonRow {
                person_id: 1,
                name: "Alice".to_string(),
                item_count: 3,
                has_cluster: false,
            },
            LegacyPersonRow {
                person_id: 2,
                name: "Dora".to_string(),
                item_count: 40,
                has_cluster: true,
            },
        ],
    );
    let orphans = find_orphan_people(&legacy);
    assert_eq!(orphans.orphan_people.len(), 1);
    assert_eq!(orphans.orphan_people[0].legacy_person_name, "Dora");
    assert_eq!(orphans.stats.total_historical_items_lost, 40);

    let modern = modern(vec![
        modern_face(1, None, None, "a.jpg"),
        modern_face_at(1, None, None, "a.jpg", (60, 60, 90, 90)),
    ]);
    let comparison = compare_faces(&legacy, &modern, 1, Uuid::from_u128(1));
    assert_eq!(comparison.legacy_faces_count, 1);
    assert_eq!(comparison.modern_faces_count, 2);
    assert_eq!(comparison.comparisons.len(), 2);
    assert_eq!(comparison.comparisons[1].iou, 0.0);
}

#[test]
fn test_full_analysis_rejects_bad_params() {
    let params = AnalysisParams {
        min_iou: 1.5,
        ..AnalysisParams::default()
    };
    let result = run_full_analysis(&LegacyDataset::default(), &ModernDataset::default(), &params);
    assert!(result.is_err());
}

#[test]
fn test_empty_inputs_give_empty_reports() {
    let params = AnalysisParams::default();
    let full = run_full_analysis(&LegacyDataset::default(), &ModernDataset::default(), &params)
        .expect("valid params");

    assert!(full.matches.all.is_empty());
    assert!(full.unclustered.is_empty());
    assert!(full.merge_candidates.is_empty());
    assert!(full.validation_issues.is_empty());
    assert_eq!(full.analytics.stats.total_raw_pairs, 0);
    assert_eq!(full.thresholds, params);
}
