//! Explicit credentials and the single refresh-and-retry policy.
//!
//! Every mutating call to the backend goes through [`with_auth_retry`]:
//! attempt, and on `Unauthorized` refresh the credential once, store it,
//! and attempt once more. A second failure is returned as is.

use std::future::Future;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ApiError, StoreError};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access: String,
    pub refresh: String,
}

impl Credential {
    pub fn new<A: Into<String>, R: Into<String>>(access: A, refresh: R) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens never end up in logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Credential, StoreError>;
    fn set(&self, credential: Credential) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, ApiError>;
}

/// Credential pair held in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Credential) -> Self {
        Self {
            inner: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Credential, StoreError> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(StoreError::Missing)
    }

    fn set(&self, credential: Credential) -> Result<(), StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(credential);
        Ok(())
    }
}

/// Run `operation` with the stored credential, refreshing it at most once.
pub async fn with_auth_retry<S, R, F, Fut, T>(
    store: &S,
    refresher: &R,
    mut operation: F,
) -> Result<T, ApiError>
where
    S: CredentialStore + ?Sized,
    R: TokenRefresher + ?Sized,
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let credential = store.get()?;
    let refresh_token = credential.refresh.clone();

    match operation(credential).await {
        Err(e) if e.is_unauthorized() => {
            warn!("access token rejected, refreshing credentials");
            let refreshed = refresher.refresh(&refresh_token).await?;
            store.set(refreshed.clone())?;
            debug!("credentials refreshed, retrying once");
            operation(refreshed).await
        }
        other => other,
    }
}
