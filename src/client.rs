// --------------------------------------------------
// HTTP client for the plant backend.
//
// Responsibilities:
// - GET  /api/user-tasks/        task buckets
// - PUT  /api/userplant/:id/     persist a plant record
// - POST /api/refresh/           exchange a refresh token
//
// 401 maps to ApiError::Unauthorized; retrying is left to auth::with_auth_retry.
// --------------------------------------------------

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::auth::{Credential, TokenRefresher};
use crate::completion::{PlantApi, TaskSource};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{PlantCareState, TaskBuckets};

#[derive(Debug, Clone)]
pub struct HttpPlantApi {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    // Only present when the backend rotates refresh tokens
    refresh: Option<String>,
}

impl HttpPlantApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// Body of a successful response, or the matching ApiError.
async fn read_body(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::status(status.as_u16(), body));
    }
    Ok(body)
}

// Image fields are uploads on the backend side and must not be sent as JSON.
fn persist_payload(plant: &PlantCareState) -> PlantCareState {
    let mut payload = plant.clone();
    payload.image = None;
    payload.custom_image = None;
    payload.extra.remove("image");
    payload.extra.remove("custom_image");
    payload
}

#[async_trait]
impl TaskSource for HttpPlantApi {
    async fn fetch_tasks(&self, access_token: &str) -> Result<TaskBuckets, ApiError> {
        let url = self.url("/api/user-tasks/");
        debug!(%url, "fetching tasks");
        let response = self.client.get(&url).bearer_auth(access_token).send().await?;
        let body = read_body(response).await?;
        let buckets: TaskBuckets = serde_json::from_str(&body)?;
        Ok(buckets)
    }
}

#[async_trait]
impl PlantApi for HttpPlantApi {
    async fn put_plant(
        &self,
        plant: &PlantCareState,
        access_token: &str,
    ) -> Result<Option<PlantCareState>, ApiError> {
        let url = self.url(&format!("/api/userplant/{}/", plant.id));
        debug!(%url, plant_id = plant.id, "persisting plant");
        let response = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .json(&persist_payload(plant))
            .send()
            .await?;
        let body = read_body(response).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let persisted: Option<PlantCareState> = serde_json::from_str(&body)?;
        Ok(persisted)
    }
}

#[async_trait]
impl TokenRefresher for HttpPlantApi {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, ApiError> {
        let url = self.url("/api/refresh/");
        debug!(%url, "refreshing access token");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "refresh": refresh_token }))
            .send()
            .await?;
        let body = read_body(response).await?;
        let tokens: RefreshResponse = serde_json::from_str(&body)?;
        Ok(Credential {
            access: tokens.access,
            refresh: tokens.refresh.unwrap_or_else(|| refresh_token.to_string()),
        })
    }
}
