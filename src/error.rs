use thiserror::Error;

use crate::models::PlantId;

/// Failure of a call to the plant backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("credentials unavailable: {0}")]
    Credentials(#[from] StoreError),
}

impl ApiError {
    pub fn status<S: Into<String>>(status: u16, body: S) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    // The only failure the auth wrapper reacts to
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown care type: {0}")]
pub struct UnknownCareType(pub String);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no credentials stored")]
    Missing,
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("plant {plant_id} is already being saved")]
    AlreadySaving { plant_id: PlantId },
    #[error("backend did not return plant {plant_id}")]
    NotPersisted { plant_id: PlantId },
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
