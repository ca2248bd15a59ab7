//! Legacy face-tagging database (SQLite, read-only)

use flm_common::{Error, Result};
use flm_core::{LegacyDataset, LegacyFaceRow, LegacyPersonRow};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

/// Collation the legacy schema declares on its text columns
const COLLATION: &str = "NoCaseUnicode";

/// Open the legacy database read-only
///
/// Fails with `NotFound` when the file does not exist, instead of letting SQLite
/// report a generic open error.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::NotFound(format!(
            "Legacy database not found: {}",
            db_path.display()
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .collation(COLLATION, |a: &str, b: &str| {
            a.to_lowercase().cmp(&b.to_lowercase())
        });

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Every face of a named person, joined to its item and folder
///
/// Rows keep a missing item or rectangle as NULL; the dataset decides what is usable.
pub async fn fetch_face_rows(pool: &SqlitePool) -> Result<Vec<LegacyFaceRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            p.Person_Id,
            p.Person_Name,
            i.Item_FileName,
            CAST(i.Item_FileSize AS INTEGER),
            fld.Folder_Path,
            CAST(f.Face_Rect_Top AS REAL),
            CAST(f.Face_Rect_Left AS REAL),
            CAST(f.Face_Rect_Width AS REAL),
            CAST(f.Face_Rect_Height AS REAL)
        FROM Face f
        JOIN Person p ON f.Face_PersonId = p.Person_Id
        LEFT JOIN Item i ON f.Face_ItemId = i.Item_Id
        LEFT JOIN Folder fld ON i.Item_ParentFolderId = fld.Folder_Id
        WHERE p.Person_Name IS NOT NULL
          AND TRIM(p.Person_Name) != ''
        ORDER BY f.Face_Id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut faces = Vec::with_capacity(rows.len());
    for row in rows {
        faces.push(LegacyFaceRow {
            person_id: row.try_get(0)?,
            person_name: row.try_get(1)?,
            filename: row.try_get(2)?,
            filesize: row.try_get(3)?,
            folder_path: row.try_get(4)?,
            rect_top: row.try_get(5)?,
            rect_left: row.try_get(6)?,
            rect_width: row.try_get(7)?,
            rect_height: row.try_get(8)?,
        });
    }

    debug!(rows = faces.len(), "Fetched legacy face rows");
    Ok(faces)
}

/// Every named person with historical item count and cluster flag
pub async fn fetch_person_rows(pool: &SqlitePool) -> Result<Vec<LegacyPersonRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            p.Person_Id,
            p.Person_Name,
            COALESCE(p.Person_ItemCount, 0),
            (SELECT COUNT(*) FROM FaceCluster fc WHERE fc.FaceCluster_PersonId = p.Person_Id)
        FROM Person p
        WHERE p.Person_Name IS NOT NULL
          AND TRIM(p.Person_Name) != ''
        ORDER BY p.Person_Id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut people = Vec::with_capacity(rows.len());
    for row in rows {
        let clusters: i64 = row.try_get(3)?;
        people.push(LegacyPersonRow {
            person_id: row.try_get(0)?,
            name: row.try_get(1)?,
            item_count: row.try_get(2)?,
            has_cluster: clusters > 0,
        });
    }

    Ok(people)
}

/// Open, read and close the legacy database
pub async fn load_dataset(db_path: &Path) -> Result<LegacyDataset> {
    let pool = connect_readonly(db_path).await?;
    let faces = fetch_face_rows(&pool).await;
    let people = fetch_person_rows(&pool).await;
    pool.close().await;

    Ok(LegacyDataset::from_rows(faces?, people?))
}

/// Counts reported by the connection test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyStats {
    pub total_persons: i64,
    pub named_persons: i64,
    pub unique_named_persons: i64,
    pub total_faces: i64,
    pub total_items: i64,
}

pub async fn fetch_stats(pool: &SqlitePool) -> Result<LegacyStats> {
    let count = |sql: &'static str| async move {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
    };

    Ok(LegacyStats {
        total_persons: count("SELECT COUNT(*) FROM Person").await?,
        named_persons: count(
            "SELECT COUNT(*) FROM Person WHERE Person_Name IS NOT NULL AND TRIM(Person_Name) != ''",
        )
        .await?,
        unique_named_persons: count(
            "SELECT COUNT(DISTINCT Person_Name) FROM Person \
             WHERE Person_Name IS NOT NULL AND TRIM(Person_Name) != ''",
        )
        .await?,
        total_faces: count("SELECT COUNT(*) FROM Face").await?,
        total_items: count("SELECT COUNT(*) FROM Item").await?,
    })
}

/// Connection test: stats on success, the error message otherwise
pub async fn test_connection(db_path: &Path) -> std::result::Result<LegacyStats, String> {
    let pool = connect_readonly(db_path).await.map_err(|e| e.to_string())?;
    let stats = fetch_stats(&pool).await.map_err(|e| e.to_string());
    pool.close().await;
    stats
}
