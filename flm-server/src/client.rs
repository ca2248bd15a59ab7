//! Modern photo server REST client
//!
//! Authenticates with the `x-api-key` header. Write operations go through the
//! [`FaceApi`] trait so the apply workflows can run against a fake.

use async_trait::async_trait;
use flm_common::config::ModernApiSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const PING_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const PERSON_THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(30);
const ASSET_THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(60);
const LIST_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest slice of an error body kept in messages
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// One person as listed by the modern server
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePerson {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct PeopleResponse {
    #[serde(default)]
    people: Vec<RemotePerson>,
}

#[derive(Debug, Deserialize)]
struct CreatedPerson {
    id: Uuid,
}

/// Body of the face-creation endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFace {
    pub asset_id: Uuid,
    pub person_id: Uuid,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub image_width: i32,
    pub image_height: i32,
}

/// Image bytes proxied from the modern server
#[derive(Debug, Clone)]
pub struct Image {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Person and face writes used by the apply workflows
#[async_trait]
pub trait FaceApi: Send + Sync {
    /// Id of the first person whose name equals `name` exactly
    async fn find_person_by_name(&self, name: &str) -> ClientResult<Option<Uuid>>;
    async fn create_person(&self, name: &str) -> ClientResult<Uuid>;
    async fn rename_person(&self, person_id: Uuid, name: &str) -> ClientResult<()>;
    async fn reassign_face(&self, face_id: Uuid, person_id: Uuid) -> ClientResult<()>;
    async fn create_face(&self, face: &NewFace) -> ClientResult<()>;
}

/// Client bound to one server URL and key, built per request from the current settings
#[derive(Clone)]
pub struct ModernClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ModernClient {
    pub fn new(http: reqwest::Client, settings: &ModernApiSettings) -> Self {
        Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-api-key", &self.api_key)
            .timeout(timeout)
    }

    /// Fail on anything but `expected`, keeping the head of the error body
    async fn expect_status(response: reqwest::Response, expected: u16) -> ClientResult<reqwest::Response> {
        let status = response.status().as_u16();
        if status == expected {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status,
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }

    pub async fn ping(&self) -> ClientResult<()> {
        let response = self
            .request(reqwest::Method::GET, "/api/server/ping", PING_TIMEOUT)
            .send()
            .await?;
        Self::expect_status(response, 200).await.map(|_| ())
    }

    pub async fn list_people(&self) -> ClientResult<Vec<RemotePerson>> {
        let response = self
            .request(reqwest::Method::GET, "/api/people", LIST_TIMEOUT)
            .send()
            .await?;
        let response = Self::expect_status(response, 200).await?;
        let people: PeopleResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(people.people)
    }

    pub async fn person_thumbnail(&self, person_id: Uuid) -> ClientResult<Image> {
        let path = format!("/api/people/{}/thumbnail", person_id);
        let response = self
            .request(reqwest::Method::GET, &path, PERSON_THUMBNAIL_TIMEOUT)
            .send()
            .await?;
        Self::read_image(Self::expect_status(response, 200).await?).await
    }

    /// `size` is one of `preview`, `thumbnail` or `fullsize`
    pub async fn asset_thumbnail(&self, asset_id: Uuid, size: &str) -> ClientResult<Image> {
        let path = format!("/api/assets/{}/thumbnail", asset_id);
        let response = self
            .request(reqwest::Method::GET, &path, ASSET_THUMBNAIL_TIMEOUT)
            .query(&[("size", size)])
            .send()
            .await?;
        Self::read_image(Self::expect_status(response, 200).await?).await
    }

    async fn read_image(response: reqwest::Response) -> ClientResult<Image> {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(Image { content_type, bytes })
    }
}

#[async_trait]
impl FaceApi for ModernClient {
    async fn find_person_by_name(&self, name: &str) -> ClientResult<Option<Uuid>> {
        let people = self.list_people().await?;
        Ok(people.into_iter().find(|p| p.name == name).map(|p| p.id))
    }

    async fn create_person(&self, name: &str) -> ClientResult<Uuid> {
        let response = self
            .request(reqwest::Method::POST, "/api/people", WRITE_TIMEOUT)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let response = Self::expect_status(response, 201).await?;
        let created: CreatedPerson = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        debug!(person_id = %created.id, name, "Created person");
        Ok(created.id)
    }

    async fn rename_person(&self, person_id: Uuid, name: &str) -> ClientResult<()> {
        let path = format!("/api/people/{}", person_id);
        let response = self
            .request(reqwest::Method::PUT, &path, WRITE_TIMEOUT)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        Self::expect_status(response, 200).await.map(|_| ())
    }

    async fn reassign_face(&self, face_id: Uuid, person_id: Uuid) -> ClientResult<()> {
        let path = format!("/api/faces/{}", person_id);
        let response = self
            .request(reqwest::Method::PUT, &path, WRITE_TIMEOUT)
            .json(&serde_json::json!({ "id": face_id }))
            .send()
            .await?;
        Self::expect_status(response, 200).await.map(|_| ())
    }

    async fn create_face(&self, face: &NewFace) -> ClientResult<()> {
        let response = self
            .request(reqwest::Method::POST, "/api/faces", WRITE_TIMEOUT)
            .json(face)
            .send()
            .await?;
        Self::expect_status(response, 201).await.map(|_| ())
    }
}
