//! Row shapes supplied by the storage layer and the in-memory datasets built from them
//!
//! `from_rows` applies the exclusion policy: faces without usable geometry or
//! without a photo key are dropped here and never reach the matcher.

use crate::coords::{ImageSize, LegacyRect, PixelBox};
use crate::geometry::NormalizedRect;
use crate::photo::PhotoKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// One face of a named legacy person, joined to its item and folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyFaceRow {
    pub person_id: i64,
    pub person_name: String,
    pub filename: Option<String>,
    pub filesize: Option<i64>,
    pub folder_path: Option<String>,
    pub rect_top: Option<f64>,
    pub rect_left: Option<f64>,
    pub rect_width: Option<f64>,
    pub rect_height: Option<f64>,
}

impl LegacyFaceRow {
    pub fn rect(&self) -> Option<LegacyRect> {
        Some(LegacyRect::new(
            self.rect_top?,
            self.rect_left?,
            self.rect_width?,
            self.rect_height?,
        ))
    }

    /// `folder/filename`, or the bare filename without a folder
    pub fn item_path(&self) -> Option<String> {
        let filename = self.filename.as_deref().filter(|f| !f.is_empty())?;
        Some(match self.folder_path.as_deref() {
            Some(folder) if !folder.is_empty() => format!("{}/{}", folder, filename),
            _ => filename.to_string(),
        })
    }
}

/// One named legacy person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPersonRow {
    pub person_id: i64,
    pub name: String,
    /// Historical item count kept by the legacy application
    pub item_count: i64,
    /// Whether a legacy face cluster references this person
    pub has_cluster: bool,
}

/// One modern face joined to its asset, exif and person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModernFaceRow {
    pub face_id: Uuid,
    pub asset_id: Uuid,
    pub person_id: Option<Uuid>,
    pub person_name: Option<String>,
    pub filename: Option<String>,
    pub filesize: Option<i64>,
    pub original_path: Option<String>,
    pub x1: Option<i32>,
    pub y1: Option<i32>,
    pub x2: Option<i32>,
    pub y2: Option<i32>,
    pub image_width: Option<i32>,
    pub image_height: Option<i32>,
}

/// One modern person (cluster), named or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModernClusterRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub is_hidden: bool,
    /// Non-deleted faces of the person, with or without a bounding box
    pub face_count: usize,
}

/// One non-deleted modern asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModernAssetRow {
    pub id: Uuid,
    pub filename: Option<String>,
    pub filesize: Option<i64>,
    pub original_path: Option<String>,
    pub exif_width: Option<i32>,
    pub exif_height: Option<i32>,
    pub is_image: bool,
}

/// Access to a face's normalized rectangle
pub trait FaceRect {
    fn rect(&self) -> &NormalizedRect;
}

impl FaceRect for NormalizedRect {
    fn rect(&self) -> &NormalizedRect {
        self
    }
}

impl<T: FaceRect + ?Sized> FaceRect for &T {
    fn rect(&self) -> &NormalizedRect {
        (**self).rect()
    }
}

/// Access to the photo a face sits on
pub trait OnPhoto {
    fn photo_key(&self) -> &PhotoKey;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyFace {
    pub person_id: i64,
    pub person_name: String,
    pub rect: NormalizedRect,
    pub key: PhotoKey,
    /// Filename with its original case
    pub filename: String,
    pub folder_path: Option<String>,
}

impl FaceRect for LegacyFace {
    fn rect(&self) -> &NormalizedRect {
        &self.rect
    }
}

impl OnPhoto for LegacyFace {
    fn photo_key(&self) -> &PhotoKey {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModernFace {
    pub face_id: Uuid,
    pub asset_id: Uuid,
    /// `None` for unclustered faces
    pub cluster_id: Option<Uuid>,
    /// `None` for unnamed clusters
    pub cluster_name: Option<String>,
    pub rect: NormalizedRect,
    pub key: PhotoKey,
    pub filename: String,
    pub original_path: Option<String>,
    pub image: ImageSize,
}

impl FaceRect for ModernFace {
    fn rect(&self) -> &NormalizedRect {
        &self.rect
    }
}

impl OnPhoto for ModernFace {
    fn photo_key(&self) -> &PhotoKey {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyPerson {
    pub id: i64,
    pub name: String,
    /// Face rows loaded for this person, usable or not
    pub face_count: usize,
    pub item_count: i64,
    pub has_cluster: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModernCluster {
    pub id: Uuid,
    pub name: Option<String>,
    pub is_hidden: bool,
    /// Non-deleted faces of the cluster, including those without a bounding box
    pub face_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModernAsset {
    pub id: Uuid,
    pub key: PhotoKey,
    pub filename: String,
    pub original_path: Option<String>,
    pub exif_size: Option<ImageSize>,
    pub is_image: bool,
}

/// Everything loaded from the legacy database for one analysis run
#[derive(Debug, Clone, Default)]
pub struct LegacyDataset {
    /// Usable faces in load order
    pub faces: Vec<LegacyFace>,
    /// Named people keyed by id
    pub people: BTreeMap<i64, LegacyPerson>,
    /// Raw face rows of named people, kept for diagnostics
    pub rows: Vec<LegacyFaceRow>,
}

impl LegacyDataset {
    pub fn from_rows(face_rows: Vec<LegacyFaceRow>, person_rows: Vec<LegacyPersonRow>) -> Self {
        let mut people: BTreeMap<i64, LegacyPerson> = BTreeMap::new();

        for row in person_rows {
            let name = row.name.trim();
            if name.is_empty() {
                continue;
            }
            people.insert(
                row.person_id,
                LegacyPerson {
                    id: row.person_id,
                    name: name.to_string(),
                    face_count: 0,
                    item_count: row.item_count,
                    has_cluster: row.has_cluster,
                },
            );
        }

        let mut faces = Vec::with_capacity(face_rows.len());
        let mut rows = Vec::with_capacity(face_rows.len());
        let mut skipped_geometry = 0usize;
        let mut skipped_key = 0usize;

        for row in face_rows {
            let name = row.person_name.trim();
            if name.is_empty() {
                continue;
            }

            let person = people.entry(row.person_id).or_insert_with(|| LegacyPerson {
                id: row.person_id,
                name: name.to_string(),
                face_count: 0,
                item_count: 0,
                has_cluster: false,
            });
            person.face_count += 1;

            match (row.rect(), PhotoKey::new(row.filename.as_deref(), row.filesize)) {
                (Some(rect), Some(key)) => faces.push(LegacyFace {
                    person_id: row.person_id,
                    person_name: name.to_string(),
                    rect: rect.to_normalized(),
                    key,
                    filename: row.filename.clone().unwrap_or_default(),
                    folder_path: row.folder_path.clone(),
                }),
                (None, _) => skipped_geometry += 1,
                (_, None) => skipped_key += 1,
            }

            rows.push(row);
        }

        debug!(
            faces = faces.len(),
            people = people.len(),
            skipped_geometry,
            skipped_key,
            "Legacy dataset built"
        );

        Self {
            faces,
            people,
            rows,
        }
    }

    /// Usable faces grouped by photo
    pub fn faces_by_photo(&self) -> BTreeMap<PhotoKey, Vec<&LegacyFace>> {
        group_by_photo(&self.faces)
    }

    pub fn person_name(&self, person_id: i64) -> Option<&str> {
        self.people.get(&person_id).map(|p| p.name.as_str())
    }

    /// Raw rows of one person in load order
    pub fn rows_of(&self, person_id: i64) -> impl Iterator<Item = &LegacyFaceRow> {
        self.rows.iter().filter(move |r| r.person_id == person_id)
    }
}

/// Everything loaded from the modern database for one analysis run
#[derive(Debug, Clone, Default)]
pub struct ModernDataset {
    /// Usable faces in load order, clustered and unclustered
    pub faces: Vec<ModernFace>,
    pub clusters: BTreeMap<Uuid, ModernCluster>,
    /// Assets with a usable photo key
    pub assets: Vec<ModernAsset>,
    /// Face rows per asset, usable or not
    pub asset_face_counts: HashMap<Uuid, usize>,
    /// Image dimensions reported by face rows
    pub face_image_sizes: HashMap<Uuid, ImageSize>,
}

impl ModernDataset {
    pub fn from_rows(
        face_rows: Vec<ModernFaceRow>,
        cluster_rows: Vec<ModernClusterRow>,
        asset_rows: Vec<ModernAssetRow>,
    ) -> Self {
        let mut clusters: BTreeMap<Uuid, ModernCluster> = cluster_rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    ModernCluster {
                        id: row.id,
                        name: non_empty(row.name),
                        is_hidden: row.is_hidden,
                        face_count: row.face_count,
                    },
                )
            })
            .collect();
        // Clusters seen only through face rows are counted from those rows
        let listed: HashSet<Uuid> = clusters.keys().copied().collect();

        let mut faces = Vec::with_capacity(face_rows.len());
        let mut asset_face_counts: HashMap<Uuid, usize> = HashMap::new();
        let mut face_image_sizes: HashMap<Uuid, ImageSize> = HashMap::new();
        let mut skipped = 0usize;

        for row in face_rows {
            *asset_face_counts.entry(row.asset_id).or_default() += 1;

            let cluster_name = non_empty(row.person_name.clone());
            if let Some(cluster_id) = row.person_id.filter(|id| !listed.contains(id)) {
                let cluster = clusters.entry(cluster_id).or_insert_with(|| ModernCluster {
                    id: cluster_id,
                    name: cluster_name.clone(),
                    is_hidden: false,
                    face_count: 0,
                });
                cluster.face_count += 1;
            }

            let size = ImageSize::from_optional(row.image_width, row.image_height);
            if let Some(size) = size {
                face_image_sizes.entry(row.asset_id).or_insert(size);
            }

            let pixel_box = match (row.x1, row.y1, row.x2, row.y2) {
                (Some(x1), Some(y1), Some(x2), Some(y2)) => Some(PixelBox::new(x1, y1, x2, y2)),
                _ => None,
            };
            let rect = size.zip(pixel_box).and_then(|(s, b)| b.normalize(s));
            let key = PhotoKey::new(row.filename.as_deref(), row.filesize);

            match (rect, key, size) {
                (Some(rect), Some(key), Some(image)) => faces.push(ModernFace {
                    face_id: row.face_id,
                    asset_id: row.asset_id,
                    cluster_id: row.person_id,
                    cluster_name,
                    rect,
                    key,
                    filename: row.filename.unwrap_or_default(),
                    original_path: row.original_path,
                    image,
                }),
                _ => skipped += 1,
            }
        }

        let assets: Vec<ModernAsset> = asset_rows
            .into_iter()
            .filter_map(|row| {
                let key = PhotoKey::new(row.filename.as_deref(), row.filesize)?;
                Some(ModernAsset {
                    id: row.id,
                    key,
                    filename: row.filename.unwrap_or_default(),
                    original_path: row.original_path,
                    exif_size: ImageSize::from_optional(row.exif_width, row.exif_height),
                    is_image: row.is_image,
                })
            })
            .collect();

        debug!(
            faces = faces.len(),
            clusters = clusters.len(),
            assets = assets.len(),
            skipped,
            "Modern dataset built"
        );

        Self {
            faces,
            clusters,
            assets,
            asset_face_counts,
            face_image_sizes,
        }
    }

    /// Faces assigned to a cluster
    pub fn clustered_faces(&self) -> impl Iterator<Item = &ModernFace> {
        self.faces.iter().filter(|f| f.cluster_id.is_some())
    }

    /// Faces not assigned to any cluster
    pub fn unclustered_faces(&self) -> impl Iterator<Item = &ModernFace> {
        self.faces.iter().filter(|f| f.cluster_id.is_none())
    }

    /// Exact person name → id for every named cluster
    ///
    /// On duplicate names the lowest cluster id wins, so the choice does not
    /// depend on database row order.
    pub fn named_people(&self) -> HashMap<&str, Uuid> {
        let mut named = HashMap::new();
        for cluster in self.clusters.values() {
            if let Some(name) = cluster.name.as_deref() {
                named.entry(name).or_insert(cluster.id);
            }
        }
        named
    }

    pub fn cluster_name(&self, cluster_id: &Uuid) -> Option<&str> {
        self.clusters.get(cluster_id).and_then(|c| c.name.as_deref())
    }

    /// One asset per photo key, optionally restricted to images
    ///
    /// The first asset in load order wins when several share a key; later
    /// duplicates are ignored rather than overwriting it.
    pub fn assets_by_photo(&self, images_only: bool) -> BTreeMap<PhotoKey, &ModernAsset> {
        let mut map = BTreeMap::new();
        for asset in &self.assets {
            if images_only && !asset.is_image {
                continue;
            }
            map.entry(asset.key.clone()).or_insert(asset);
        }
        map
    }

    /// Dimensions of an asset: face rows first, then exif, then the fixed fallback
    pub fn image_size_of(&self, asset: &ModernAsset) -> ImageSize {
        self.face_image_sizes
            .get(&asset.id)
            .copied()
            .or(asset.exif_size)
            .unwrap_or(ImageSize::FALLBACK)
    }
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.is_empty())
}

/// Group faces by photo key, keeping load order within each photo
pub fn group_by_photo<'a, T, I>(faces: I) -> BTreeMap<PhotoKey, Vec<&'a T>>
where
    T: OnPhoto + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut grouped: BTreeMap<PhotoKey, Vec<&'a T>> = BTreeMap::new();
    for face in faces {
        grouped.entry(face.photo_key().clone()).or_default().push(face);
    }
    grouped
}
