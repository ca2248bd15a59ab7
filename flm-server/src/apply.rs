//! Write-back workflows against the modern server
//!
//! Operations run one at a time with no rollback. Each attempted operation
//! yields its own outcome, so a partial failure is visible item by item.

use crate::client::{FaceApi, NewFace};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

fn default_dry_run() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    WouldApply,
    Created,
    WouldCreate,
    AlreadyExists,
    Assigned,
    WouldAssign,
    Failed,
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        *self == OutcomeStatus::Failed
    }
}

// ---------------------------------------------------------------------------
// Apply names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NameAssignment {
    pub cluster_id: Uuid,
    pub person_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyNamesRequest {
    pub matches: Vec<NameAssignment>,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameOutcome {
    pub cluster_id: Uuid,
    pub person_name: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyNamesReport {
    pub dry_run: bool,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub results: Vec<NameOutcome>,
}

/// Rename each approved cluster to its legacy person's name
pub async fn apply_names(api: &dyn FaceApi, request: &ApplyNamesRequest) -> ApplyNamesReport {
    let mut results = Vec::with_capacity(request.matches.len());

    for item in &request.matches {
        let (status, error) = if request.dry_run {
            (OutcomeStatus::WouldApply, None)
        } else {
            match api.rename_person(item.cluster_id, &item.person_name).await {
                Ok(()) => (OutcomeStatus::Applied, None),
                Err(e) => {
                    warn!(cluster_id = %item.cluster_id, error = %e, "Rename failed");
                    (OutcomeStatus::Failed, Some(e.to_string()))
                }
            }
        };
        results.push(NameOutcome {
            cluster_id: item.cluster_id,
            person_name: item.person_name.clone(),
            status,
            error,
        });
    }

    let failed_count = results.iter().filter(|r| r.status.is_failure()).count();
    info!(
        dry_run = request.dry_run,
        total = results.len(),
        failed = failed_count,
        "Apply names finished"
    );

    ApplyNamesReport {
        dry_run: request.dry_run,
        total: results.len(),
        success_count: results.len() - failed_count,
        failed_count,
        results,
    }
}

// ---------------------------------------------------------------------------
// Person resolution shared by the two face workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonOutcome {
    pub legacy_person_id: i64,
    pub person_name: String,
    /// `None` in dry-run when the person would be created, or on failure
    pub person_id: Option<Uuid>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Find the person by exact name, creating it unless this is a dry run
async fn resolve_person(api: &dyn FaceApi, legacy_person_id: i64, name: &str, dry_run: bool) -> PersonOutcome {
    let outcome = |person_id, status, error| PersonOutcome {
        legacy_person_id,
        person_name: name.to_string(),
        person_id,
        status,
        error,
    };

    match api.find_person_by_name(name).await {
        Ok(Some(id)) => outcome(Some(id), OutcomeStatus::AlreadyExists, None),
        Ok(None) if dry_run => outcome(None, OutcomeStatus::WouldCreate, None),
        Ok(None) => match api.create_person(name).await {
            Ok(id) => outcome(Some(id), OutcomeStatus::Created, None),
            Err(e) => {
                warn!(name, error = %e, "Person creation failed");
                outcome(None, OutcomeStatus::Failed, Some(e.to_string()))
            }
        },
        Err(e) => {
            warn!(name, error = %e, "Person lookup failed");
            outcome(None, OutcomeStatus::Failed, Some(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Apply unclustered
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct UnclusteredItem {
    pub person_id: i64,
    pub person_name: String,
    pub face_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyUnclusteredRequest {
    pub items: Vec<UnclusteredItem>,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceOutcome {
    pub face_id: Uuid,
    pub person_id: Option<Uuid>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyUnclusteredReport {
    pub dry_run: bool,
    pub people: Vec<PersonOutcome>,
    pub faces: Vec<FaceOutcome>,
    pub people_created: usize,
    pub faces_assigned: usize,
    pub failed_count: usize,
}

/// Assign unclustered faces to a person named after the legacy person
///
/// A failed person creation skips that item's faces.
pub async fn apply_unclustered(api: &dyn FaceApi, request: &ApplyUnclusteredRequest) -> ApplyUnclusteredReport {
    let mut people = Vec::with_capacity(request.items.len());
    let mut faces = Vec::new();

    for item in &request.items {
        let person = resolve_person(api, item.person_id, &item.person_name, request.dry_run).await;
        if person.status.is_failure() {
            people.push(person);
            continue;
        }

        for face_id in &item.face_ids {
            let (status, error) = match (request.dry_run, person.person_id) {
                (false, Some(person_id)) => match api.reassign_face(*face_id, person_id).await {
                    Ok(()) => (OutcomeStatus::Assigned, None),
                    Err(e) => (OutcomeStatus::Failed, Some(e.to_string())),
                },
                _ => (OutcomeStatus::WouldAssign, None),
            };
            faces.push(FaceOutcome {
                face_id: *face_id,
                person_id: person.person_id,
                status,
                error,
            });
        }
        people.push(person);
    }

    let failed_count = people.iter().filter(|p| p.status.is_failure()).count()
        + faces.iter().filter(|f| f.status.is_failure()).count();
    let report = ApplyUnclusteredReport {
        dry_run: request.dry_run,
        people_created: people.iter().filter(|p| p.status == OutcomeStatus::Created).count(),
        faces_assigned: faces.iter().filter(|f| f.status == OutcomeStatus::Assigned).count(),
        failed_count,
        people,
        faces,
    };

    info!(
        dry_run = report.dry_run,
        people_created = report.people_created,
        faces_assigned = report.faces_assigned,
        failed = report.failed_count,
        "Apply unclustered finished"
    );
    report
}

// ---------------------------------------------------------------------------
// Create faces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FaceToCreate {
    pub asset_id: Uuid,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub image_width: i32,
    pub image_height: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFacesRequest {
    pub person_id: i64,
    pub person_name: String,
    pub faces: Vec<FaceToCreate>,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedFaceOutcome {
    pub asset_id: Uuid,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateFacesReport {
    pub success: bool,
    pub dry_run: bool,
    pub person: PersonOutcome,
    pub faces: Vec<CreatedFaceOutcome>,
    pub faces_created: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Create the legacy person's missing faces on their assets
///
/// A failed person creation aborts the request before any face is written.
pub async fn create_faces(api: &dyn FaceApi, request: &CreateFacesRequest) -> CreateFacesReport {
    let person = resolve_person(api, request.person_id, &request.person_name, request.dry_run).await;

    if person.status.is_failure() {
        let error = person
            .error
            .as_ref()
            .map(|e| format!("Failed to resolve person {}: {}", request.person_name, e));
        return CreateFacesReport {
            success: false,
            dry_run: request.dry_run,
            person,
            faces: Vec::new(),
            faces_created: 0,
            failed_count: 0,
            error,
        };
    }

    let mut faces = Vec::with_capacity(request.faces.len());
    for face in &request.faces {
        let (status, error) = match (request.dry_run, person.person_id) {
            (false, Some(person_id)) => {
                let body = NewFace {
                    asset_id: face.asset_id,
                    person_id,
                    x: face.x,
                    y: face.y,
                    width: face.width,
                    height: face.height,
                    image_width: face.image_width,
                    image_height: face.image_height,
                };
                match api.create_face(&body).await {
                    Ok(()) => (OutcomeStatus::Created, None),
                    Err(e) => (OutcomeStatus::Failed, Some(e.to_string())),
                }
            }
            _ => (OutcomeStatus::WouldCreate, None),
        };
        faces.push(CreatedFaceOutcome {
            asset_id: face.asset_id,
            status,
            error,
        });
    }

    let failed_count = faces.iter().filter(|f| f.status.is_failure()).count();
    let faces_created = faces.iter().filter(|f| f.status == OutcomeStatus::Created).count();

    info!(
        dry_run = request.dry_run,
        person = %request.person_name,
        faces_created,
        failed = failed_count,
        "Create faces finished"
    );

    CreateFacesReport {
        success: failed_count == 0,
        dry_run: request.dry_run,
        person,
        faces,
        faces_created,
        failed_count,
        error: None,
    }
}
