//! Integration tests for flm-server API endpoints
//!
//! Only routes that stop before the modern database are exercised here:
//! health, configuration, parameter rejection and legacy-only diagnostics.
//! The modern database points at a closed local port so connections fail fast.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use flm_common::config::{CliOverrides, Settings, SettingsContext, TomlConfig};
use flm_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app whose legacy database points at `legacy_db`
fn setup_app(legacy_db: PathBuf) -> axum::Router {
    let cli = CliOverrides {
        legacy_db: Some(legacy_db),
        modern_db_host: Some("127.0.0.1".to_string()),
        modern_db_port: Some(9),
        modern_api_url: Some("http://127.0.0.1:9".to_string()),
        ..CliOverrides::default()
    };
    let settings = Settings::resolve(&cli, &TomlConfig::default()).expect("settings");
    let state = AppState::new(SettingsContext::new(settings), reqwest::Client::new());
    build_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: small legacy database with two named people, one of them orphaned
async fn create_legacy_db(dir: &Path) -> PathBuf {
    let path = dir.join("MediaDb.v1.sqlite");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("create legacy db");

    for statement in [
        "CREATE TABLE Folder (Folder_Id INTEGER PRIMARY KEY, Folder_Path TEXT)",
        "CREATE TABLE Item (Item_Id INTEGER PRIMARY KEY, Item_FileName TEXT, Item_FileSize INTEGER, Item_ParentFolderId INTEGER)",
        "CREATE TABLE Person (Person_Id INTEGER PRIMARY KEY, Person_Name TEXT, Person_ItemCount INTEGER)",
        "CREATE TABLE Face (Face_Id INTEGER PRIMARY KEY, Face_PersonId INTEGER, Face_ItemId INTEGER, \
         Face_Rect_Top REAL, Face_Rect_Left REAL, Face_Rect_Width REAL, Face_Rect_Height REAL)",
        "CREATE TABLE FaceCluster (FaceCluster_Id INTEGER PRIMARY KEY, FaceCluster_PersonId INTEGER)",
        "INSERT INTO Folder VALUES (1, 'D:/Photos')",
        "INSERT INTO Item VALUES (1, 'IMG_0001.JPG', 123456, 1)",
        "INSERT INTO Item VALUES (2, 'loose.jpg', 999, NULL)",
        "INSERT INTO Person VALUES (1, 'Alice', 12)",
        "INSERT INTO Person VALUES (2, 'Bob', 40)",
        "INSERT INTO Person VALUES (3, '  ', 5)",
        "INSERT INTO Person VALUES (4, 'Carol', NULL)",
        "INSERT INTO Face VALUES (1, 1, 1, 0.1, 0.2, 0.3, 0.4)",
        "INSERT INTO Face VALUES (2, 1, 2, 0.5, 0.5, 0.1, 0.1)",
        "INSERT INTO Face VALUES (3, 3, 1, 0.1, 0.1, 0.1, 0.1)",
        "INSERT INTO Face VALUES (4, 1, 1, NULL, 0.2, 0.3, 0.4)",
        "INSERT INTO FaceCluster VALUES (1, 2)",
    ] {
        sqlx::query(statement).execute(&pool).await.expect(statement);
    }
    pool.close().await;

    path
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    for uri in ["/health", "/api/health"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = extract_json(response.into_body()).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["module"], "flm-server");
    }
}

#[tokio::test]
async fn test_stats_reports_unreachable_source_as_null() {
    let dir = TempDir::new().unwrap();
    let db = create_legacy_db(dir.path()).await;
    let app = setup_app(db);

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["legacy_db"]["total_persons"], 4);
    assert_eq!(json["legacy_db"]["named_persons"], 3);
    assert!(json["modern_db"].is_null());
}

#[tokio::test]
async fn test_stats_with_no_reachable_source() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert!(json["legacy_db"].is_null());
    assert!(json["modern_db"].is_null());
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_get_config_reports_effective_settings() {
    let app = setup_app(PathBuf::from("/data/legacy.sqlite"));

    let response = app.oneshot(get("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["legacy_db"], "/data/legacy.sqlite");
    assert_eq!(json["modern_api_url"], "http://127.0.0.1:9");
    assert_eq!(json["has_overrides"]["legacy_db"], false);
}

#[tokio::test]
async fn test_set_legacy_db_requires_existing_file() {
    let app = setup_app(PathBuf::from("/data/legacy.sqlite"));

    let response = app
        .oneshot(post_json(
            "/api/config/legacy-db",
            json!({"path": "/nonexistent/other.sqlite"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_set_legacy_db_is_applied_in_memory() {
    let dir = TempDir::new().unwrap();
    let db = create_legacy_db(dir.path()).await;
    let app = setup_app(PathBuf::from("/data/legacy.sqlite"));

    let response = app
        .clone()
        .oneshot(post_json("/api/config/legacy-db", json!({"path": db})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["legacy_db"], db.display().to_string());
    assert_eq!(json["has_overrides"]["legacy_db"], true);

    // Later requests see the override
    let response = app.oneshot(get("/api/diagnostics/orphan-people")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_set_modern_api_rejects_non_http_url() {
    let app = setup_app(PathBuf::from("/data/legacy.sqlite"));

    let response = app
        .oneshot(post_json("/api/config/modern-api", json!({"url": "ftp://server"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Parameter validation
// =============================================================================

#[tokio::test]
async fn test_match_run_rejects_out_of_range_iou() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app
        .oneshot(post_json("/api/matches/run", json!({"min_iou": 2.0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "INVALID_PARAMS");
}

#[tokio::test]
async fn test_malformed_json_body_is_rejected() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/validation/run")
        .header("content-type", "application/json")
        .body(Body::from("{min_faces"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_query_is_rejected() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app
        .oneshot(get("/api/matches/unmatched?min_iou=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_create_faces_preview_rejects_negative_iou() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app
        .oneshot(post_json("/api/create-faces/preview", json!({"min_iou": -0.1})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_photo_size_must_be_known() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app
        .oneshot(get(
            "/api/photos/modern/6f1c1a8e-8f7b-4d3c-9a57-1d2e3f4a5b6c?size=huge",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_rejects_bad_asset_id() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app
        .oneshot(get("/api/diagnostics/compare/1/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_apply_body_shape_is_checked() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app
        .clone()
        .oneshot(post_json("/api/apply", json!({"matches": "cluster"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    // Nothing to apply: no upstream call, dry run by default
    let response = app
        .oneshot(post_json("/api/apply", json!({"matches": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_match_preview_needs_legacy_db() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app.oneshot(get("/api/matches/preview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_match_preview_reports_unreachable_modern_db() {
    let dir = TempDir::new().unwrap();
    let db = create_legacy_db(dir.path()).await;
    let app = setup_app(db);

    let response = app.oneshot(get("/api/matches/preview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "DATABASE_ERROR");
}

// =============================================================================
// Legacy-only diagnostics
// =============================================================================

#[tokio::test]
async fn test_orphan_people_missing_legacy_db() {
    let app = setup_app(PathBuf::from("/nonexistent/legacy.sqlite"));

    let response = app.oneshot(get("/api/diagnostics/orphan-people")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_orphan_people_lists_people_without_faces() {
    let dir = TempDir::new().unwrap();
    let db = create_legacy_db(dir.path()).await;
    let app = setup_app(db);

    let response = app.oneshot(get("/api/diagnostics/orphan-people")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    // Blank-named person 3 is not a named person
    assert_eq!(json["total_named_people"], 3);

    let orphans = json["orphan_people"].as_array().expect("orphan list");
    assert_eq!(orphans.len(), 2);
    assert_eq!(orphans[0]["legacy_person_name"], "Bob");
    assert_eq!(orphans[0]["historical_item_count"], 40);
    assert_eq!(orphans[0]["has_cluster"], true);
    assert_eq!(orphans[1]["legacy_person_name"], "Carol");
    assert_eq!(orphans[1]["historical_item_count"], 0);

    assert_eq!(json["stats"]["orphan_count"], 2);
    assert_eq!(json["stats"]["with_faces_count"], 1);
    assert_eq!(json["stats"]["total_historical_items_lost"], 40);
}

#[tokio::test]
async fn test_legacy_loader_keeps_unusable_rows_for_diagnostics() {
    let dir = TempDir::new().unwrap();
    let db = create_legacy_db(dir.path()).await;

    let dataset = flm_server::db::legacy::load_dataset(&db).await.expect("load");

    // Alice has three rows; the one without a top edge is not usable
    assert_eq!(dataset.people[&1].face_count, 3);
    assert_eq!(dataset.rows.len(), 3);
    assert_eq!(dataset.faces.len(), 2);

    let first = &dataset.faces[0];
    assert_eq!(first.person_name, "Alice");
    assert_eq!(first.filename, "IMG_0001.JPG");
    assert_eq!(first.key.filename, "img_0001.jpg");
    assert_eq!(first.key.filesize, 123456);
    assert_eq!(dataset.rows[0].item_path().as_deref(), Some("D:/Photos/IMG_0001.JPG"));
    assert_eq!(dataset.rows[1].item_path().as_deref(), Some("loose.jpg"));
}

#[tokio::test]
async fn test_legacy_connection_stats() {
    let dir = TempDir::new().unwrap();
    let db = create_legacy_db(dir.path()).await;

    let stats = flm_server::db::legacy::test_connection(&db).await.expect("connect");
    assert_eq!(stats.total_persons, 4);
    assert_eq!(stats.named_persons, 3);
    assert_eq!(stats.total_faces, 4);
    assert_eq!(stats.total_items, 2);

    let missing = flm_server::db::legacy::test_connection(Path::new("/nonexistent/x.sqlite")).await;
    assert!(missing.is_err());
}
