//! Marking a care task as done.
//!
//! The completer patches the plant's last-done date, persists it through
//! [`PlantApi`] under [`with_auth_retry`], and on confirmed success hands
//! back the working list without the completed plant+type tasks. A failed
//! attempt never changes the list.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::auth::{CredentialStore, TokenRefresher, with_auth_retry};
use crate::error::{ApiError, CompletionError};
use crate::logic;
use crate::models::{CareTask, PlantCareState, PlantId, TaskBuckets};

/// Persist-plant call. `Ok(None)` means the backend answered without a record.
#[async_trait]
pub trait PlantApi: Send + Sync {
    async fn put_plant(
        &self,
        plant: &PlantCareState,
        access_token: &str,
    ) -> Result<Option<PlantCareState>, ApiError>;
}

/// Source of the three task buckets.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_tasks(&self, access_token: &str) -> Result<TaskBuckets, ApiError>;
}

pub struct TaskCompleter<A, S, R>
where
    A: PlantApi + ?Sized,
    S: CredentialStore + ?Sized,
    R: TokenRefresher + ?Sized,
{
    api: Arc<A>,
    credentials: Arc<S>,
    refresher: Arc<R>,
    in_flight: Mutex<HashSet<PlantId>>,
}

// Releases the plant's in-flight marker on every exit path
struct InFlight<'a> {
    set: &'a Mutex<HashSet<PlantId>>,
    plant_id: PlantId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.plant_id);
    }
}

impl<A, S, R> TaskCompleter<A, S, R>
where
    A: PlantApi + ?Sized,
    S: CredentialStore + ?Sized,
    R: TokenRefresher + ?Sized,
{
    pub fn new(api: Arc<A>, credentials: Arc<S>, refresher: Arc<R>) -> Self {
        Self {
            api,
            credentials,
            refresher,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_saving(&self, plant_id: PlantId) -> bool {
        let set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.contains(&plant_id)
    }

    fn begin(&self, plant_id: PlantId) -> Result<InFlight<'_>, CompletionError> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(plant_id) {
            return Err(CompletionError::AlreadySaving { plant_id });
        }
        Ok(InFlight {
            set: &self.in_flight,
            plant_id,
        })
    }

    /// Complete `task` as of `today`.
    ///
    /// On success `on_refresh` is called once and the new working list is
    /// returned. On any error `tasks` is left as it was and `on_refresh`
    /// is not called.
    pub async fn complete_task<F>(
        &self,
        task: &CareTask,
        tasks: &[CareTask],
        today: NaiveDate,
        on_refresh: F,
    ) -> Result<Vec<CareTask>, CompletionError>
    where
        F: FnOnce(),
    {
        let span = info_span!(
            "complete_task",
            plant_id = task.plant_id(),
            care_type = %task.kind,
            attempt = %Uuid::new_v4()
        );
        self.persist_completion(task, tasks, today, on_refresh)
            .instrument(span)
            .await
    }

    async fn persist_completion<F>(
        &self,
        task: &CareTask,
        tasks: &[CareTask],
        today: NaiveDate,
        on_refresh: F,
    ) -> Result<Vec<CareTask>, CompletionError>
    where
        F: FnOnce(),
    {
        let plant_id = task.plant_id();
        let _guard = self.begin(plant_id)?;

        let updated = logic::mark_care_done(&task.plant, task.kind, today);
        let api = &*self.api;
        let plant = &updated;

        let persisted = with_auth_retry(&*self.credentials, &*self.refresher, |credential| async move {
            api.put_plant(plant, &credential.access).await
        })
        .await;

        match persisted {
            Ok(Some(_)) => {
                let remaining = logic::remove_completed(tasks, plant_id, task.kind);
                info!(removed = tasks.len() - remaining.len(), "task completed");
                on_refresh();
                Ok(remaining)
            }
            Ok(None) => {
                error!("backend returned no plant record");
                Err(CompletionError::NotPersisted { plant_id })
            }
            Err(e) => {
                error!(error = %e, "failed to complete task");
                Err(CompletionError::Api(e))
            }
        }
    }

    /// Fetch the task buckets with the same refresh-once policy.
    pub async fn fetch_tasks<T>(&self, source: &T) -> Result<TaskBuckets, ApiError>
    where
        T: TaskSource + ?Sized,
    {
        with_auth_retry(&*self.credentials, &*self.refresher, |credential| async move {
            source.fetch_tasks(&credential.access).await
        })
        .await
    }
}
