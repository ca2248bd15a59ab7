//! Modern photo library database (PostgreSQL, read-only)

use flm_common::config::ModernDbSettings;
use flm_common::Result;
use flm_core::{ModernAssetRow, ModernClusterRow, ModernDataset, ModernFaceRow};
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn connect_readonly(settings: &ModernDbSettings) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .database(&settings.name)
        .username(&settings.user)
        .password(&settings.password)
        .options([("default_transaction_read_only", "on")]);

    debug!(url = %settings.display_url(), "Connecting to modern database");

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Non-deleted faces with a bounding box on non-deleted assets, clustered or not
pub async fn fetch_face_rows(pool: &PgPool) -> Result<Vec<ModernFaceRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            af.id,
            af."assetId",
            af."personId",
            p.name,
            a."originalFileName",
            e."fileSizeInByte",
            a."originalPath",
            af."boundingBoxX1",
            af."boundingBoxY1",
            af."boundingBoxX2",
            af."boundingBoxY2",
            af."imageWidth",
            af."imageHeight"
        FROM asset_face af
        JOIN asset a ON af."assetId" = a.id
        LEFT JOIN asset_exif e ON a.id = e."assetId"
        LEFT JOIN person p ON af."personId" = p.id
        WHERE af."deletedAt" IS NULL
          AND a."deletedAt" IS NULL
          AND af."boundingBoxX1" IS NOT NULL
        ORDER BY af."assetId", af.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut faces = Vec::with_capacity(rows.len());
    for row in rows {
        faces.push(ModernFaceRow {
            face_id: row.try_get(0)?,
            asset_id: row.try_get(1)?,
            person_id: row.try_get(2)?,
            person_name: row.try_get(3)?,
            filename: row.try_get(4)?,
            filesize: row.try_get(5)?,
            original_path: row.try_get(6)?,
            x1: row.try_get(7)?,
            y1: row.try_get(8)?,
            x2: row.try_get(9)?,
            y2: row.try_get(10)?,
            image_width: row.try_get(11)?,
            image_height: row.try_get(12)?,
        });
    }

    debug!(rows = faces.len(), "Fetched modern face rows");
    Ok(faces)
}

/// Every person (cluster), named or not, with its non-deleted face count
pub async fn fetch_cluster_rows(pool: &PgPool) -> Result<Vec<ModernClusterRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            p.id,
            p.name,
            p."isHidden",
            (SELECT COUNT(*) FROM asset_face af
              WHERE af."personId" = p.id AND af."deletedAt" IS NULL)
        FROM person p
        ORDER BY p.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut clusters = Vec::with_capacity(rows.len());
    for row in rows {
        let face_count: i64 = row.try_get(3)?;
        clusters.push(ModernClusterRow {
            id: row.try_get(0)?,
            name: row.try_get(1)?,
            is_hidden: row.try_get(2)?,
            face_count: usize::try_from(face_count).unwrap_or(0),
        });
    }
    Ok(clusters)
}

/// Non-deleted assets with exif size and image flag
pub async fn fetch_asset_rows(pool: &PgPool) -> Result<Vec<ModernAssetRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            a.id,
            a."originalFileName",
            e."fileSizeInByte",
            a."originalPath",
            e."exifImageWidth",
            e."exifImageHeight",
            a.type = 'IMAGE'
        FROM asset a
        LEFT JOIN asset_exif e ON a.id = e."assetId"
        WHERE a."deletedAt" IS NULL
        ORDER BY a.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut assets = Vec::with_capacity(rows.len());
    for row in rows {
        assets.push(ModernAssetRow {
            id: row.try_get(0)?,
            filename: row.try_get(1)?,
            filesize: row.try_get(2)?,
            original_path: row.try_get(3)?,
            exif_width: row.try_get(4)?,
            exif_height: row.try_get(5)?,
            is_image: row.try_get(6)?,
        });
    }
    Ok(assets)
}

/// Open, read and close the modern database
pub async fn load_dataset(settings: &ModernDbSettings) -> Result<ModernDataset> {
    let pool = connect_readonly(settings).await?;
    let faces = fetch_face_rows(&pool).await;
    let clusters = fetch_cluster_rows(&pool).await;
    let assets = fetch_asset_rows(&pool).await;
    pool.close().await;

    Ok(ModernDataset::from_rows(faces?, clusters?, assets?))
}

/// Counts reported by the connection test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModernStats {
    pub total_persons: i64,
    pub named_persons: i64,
    pub unique_named_persons: i64,
    pub unnamed_persons: i64,
    pub total_faces: i64,
    pub total_assets: i64,
}

pub async fn fetch_stats(pool: &PgPool) -> Result<ModernStats> {
    let count = |sql: &'static str| async move {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
    };

    let total_persons = count("SELECT COUNT(*) FROM person").await?;
    let named_persons = count("SELECT COUNT(*) FROM person WHERE name IS NOT NULL AND name != ''").await?;

    Ok(ModernStats {
        total_persons,
        named_persons,
        unique_named_persons: count(
            "SELECT COUNT(DISTINCT name) FROM person WHERE name IS NOT NULL AND name != ''",
        )
        .await?,
        unnamed_persons: total_persons - named_persons,
        total_faces: count(r#"SELECT COUNT(*) FROM asset_face WHERE "deletedAt" IS NULL"#).await?,
        total_assets: count(r#"SELECT COUNT(*) FROM asset WHERE "deletedAt" IS NULL"#).await?,
    })
}

/// Connection test: stats on success, the error message otherwise
pub async fn test_connection(settings: &ModernDbSettings) -> std::result::Result<ModernStats, String> {
    let pool = connect_readonly(settings).await.map_err(|e| e.to_string())?;
    let stats = fetch_stats(&pool).await.map_err(|e| e.to_string());
    pool.close().await;
    stats
}
