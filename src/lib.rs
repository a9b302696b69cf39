// Define data modules
pub mod models; // Care types, plant records, tasks and buckets
pub mod logic; // Grouping, due-day and completion logic
pub mod auth; // Credentials and the refresh-once retry policy
pub mod store; // Credential file (load/save credentials.json)
pub mod completion; // Completing a task against the backend
pub mod client; // HTTP implementation of the backend calls
pub mod config; // plant-tasks.toml
pub mod error;

pub use auth::{Credential, CredentialStore, MemoryCredentialStore, TokenRefresher, with_auth_retry};
pub use completion::{PlantApi, TaskCompleter, TaskSource};
pub use error::{ApiError, CompletionError, ConfigError, StoreError, UnknownCareType};
pub use models::{CareInterval, CareTask, CareTaskType, IntervalUnit, PlantCareState, PlantId, TaskBucket, TaskBuckets, WateringType};
