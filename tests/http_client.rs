use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::TempDir;

use plant_care_scheduler::client::HttpPlantApi;
use plant_care_scheduler::store::FileCredentialStore;
use plant_care_scheduler::{
    ApiError, CareTaskType, CompletionError, Credential, CredentialStore, TaskCompleter,
};

const BROKEN_PLANT: i64 = 500;
const EMPTY_PLANT: i64 = 404;

// Fake plant backend: only `valid_access` is accepted, refresh-1 can be exchanged.
struct Backend {
    valid_access: String,
    puts: Mutex<Vec<Value>>,
    refreshes: AtomicUsize,
}

impl Backend {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_access);
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

async fn user_tasks(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !backend.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "today_tasks": [
            {"type": "watering", "next_date": "2026-10-18", "user_plant": plant_json(1)},
            {"type": "pruning", "next_date": "2026-10-18", "user_plant": plant_json(1)}
        ],
        "previous_tasks": [
            {"type": "rotating", "next_date": "2026-10-12", "user_plant": plant_json(2)}
        ],
        "next_tasks": []
    }))
    .into_response()
}

async fn put_plant(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !backend.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    backend.puts.lock().unwrap().push(body.clone());
    match id {
        BROKEN_PLANT => (StatusCode::INTERNAL_SERVER_ERROR, "db down").into_response(),
        EMPTY_PLANT => Json(Value::Null).into_response(),
        _ => Json(body).into_response(),
    }
}

async fn refresh(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    backend.refreshes.fetch_add(1, Ordering::SeqCst);
    if body["refresh"] != "refresh-1" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "access": backend.valid_access })).into_response()
}

fn plant_json(id: i64) -> Value {
    json!({
        "id": id,
        "custom_name": "fern",
        "image": "https://cdn.example.org/fern.jpg",
        "custom_image": "file:///data/fern.jpg",
        "garden_name": "Balcony",
        "last_watered_date": "2026-10-11",
        "last_pruning_date": null,
        "pruning_time": 2,
        "pruning_time_unit": "week"
    })
}

struct TestApp {
    backend: Arc<Backend>,
    api: Arc<HttpPlantApi>,
    store: Arc<FileCredentialStore>,
    _dir: TempDir,
}

impl TestApp {
    async fn spawn(stored_access: &str) -> Self {
        let backend = Arc::new(Backend {
            valid_access: "fresh-access".to_string(),
            puts: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/api/user-tasks/", get(user_tasks))
            .route("/api/userplant/:id/", put(put_plant))
            .route("/api/refresh/", post(refresh))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Failed to start test server");
        });

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCredentialStore::new(dir.path().join("credentials.json")));
        store.set(Credential::new(stored_access, "refresh-1")).unwrap();

        Self {
            backend,
            api: Arc::new(HttpPlantApi::with_client(reqwest::Client::new(), &address)),
            store,
            _dir: dir,
        }
    }

    fn completer(&self) -> TaskCompleter<HttpPlantApi, FileCredentialStore, HttpPlantApi> {
        TaskCompleter::new(self.api.clone(), self.store.clone(), self.api.clone())
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

#[tokio::test]
async fn fetches_buckets_with_valid_token() {
    let app = TestApp::spawn("fresh-access").await;

    let buckets = app.completer().fetch_tasks(&*app.api).await.unwrap();

    assert_eq!(buckets.today_tasks.len(), 2);
    assert_eq!(buckets.previous_tasks.len(), 1);
    assert!(buckets.next_tasks.is_empty());
    assert_eq!(buckets.today_tasks[1].kind, CareTaskType::Pruning);
    assert_eq!(app.backend.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let app = TestApp::spawn("stale-access").await;

    let buckets = app.completer().fetch_tasks(&*app.api).await.unwrap();

    assert_eq!(buckets.today_tasks.len(), 2);
    assert_eq!(app.backend.refreshes.load(Ordering::SeqCst), 1);
    // backend did not rotate the refresh token, so the old one is kept
    let reopened = FileCredentialStore::new(app.store.path());
    assert_eq!(reopened.get().unwrap(), Credential::new("fresh-access", "refresh-1"));
}

#[tokio::test]
async fn completing_a_task_puts_the_patched_plant() {
    let app = TestApp::spawn("stale-access").await;
    let completer = app.completer();
    let buckets = completer.fetch_tasks(&*app.api).await.unwrap();
    let tasks = buckets.today_tasks;

    let remaining = completer
        .complete_task(&tasks[0], &tasks, today(), || {})
        .await
        .unwrap();

    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].kind, CareTaskType::Pruning);

    let puts = app.backend.puts.lock().unwrap().clone();
    assert_eq!(puts.len(), 1);
    let sent = &puts[0];
    assert_eq!(sent["id"], 1);
    assert_eq!(sent["last_watered_date"], "2026-10-18");
    assert_eq!(sent["last_pruning_date"], Value::Null);
    assert_eq!(sent["garden_name"], "Balcony");
    assert_eq!(sent["pruning_time_unit"], "week");
    assert!(sent.get("image").is_none());
    assert!(sent.get("custom_image").is_none());
}

#[tokio::test]
async fn server_error_is_surfaced() {
    let app = TestApp::spawn("fresh-access").await;
    let completer = app.completer();
    let mut tasks = completer.fetch_tasks(&*app.api).await.unwrap().today_tasks;
    tasks[0].plant.id = BROKEN_PLANT;

    let result = completer.complete_task(&tasks[0], &tasks, today(), || {}).await;

    match result {
        Err(CompletionError::Api(ApiError::Status { status, body })) => {
            assert_eq!(status, 500);
            assert_eq!(body, "db down");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn null_response_is_not_persisted() {
    let app = TestApp::spawn("fresh-access").await;
    let completer = app.completer();
    let mut tasks = completer.fetch_tasks(&*app.api).await.unwrap().today_tasks;
    tasks[0].plant.id = EMPTY_PLANT;

    let result = completer.complete_task(&tasks[0], &tasks, today(), || {}).await;

    assert!(matches!(
        result,
        Err(CompletionError::NotPersisted { plant_id: EMPTY_PLANT })
    ));
}

#[tokio::test]
async fn rejected_refresh_token_fails_without_retry() {
    let app = TestApp::spawn("stale-access").await;
    app.store.set(Credential::new("stale-access", "revoked")).unwrap();

    let result = app.completer().fetch_tasks(&*app.api).await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(app.backend.refreshes.load(Ordering::SeqCst), 1);
}
