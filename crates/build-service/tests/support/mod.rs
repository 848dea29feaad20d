//! Shared fixtures for Build Service integration tests

#![allow(dead_code)]

use anyhow::Result;
use app_generator::TemplateGenerator;
use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{post, put},
    Json, Router,
};
use build_service::{
    create_router, AppState, BuildStatusRecord, Config, EvaluationClient, Pipeline, Publisher,
    RemoteRepository, RepositoryHost, RetentionPolicy, RetryPolicy, StatusStore, WorkerConfig,
    WorkerPool,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

pub const EMAIL: &str = "a@b.com";
pub const SECRET: &str = "s";

/// Evaluator URL that refuses connections
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1/notify";

pub fn test_config() -> Config {
    Config {
        student_email: EMAIL.to_string(),
        student_secret: SecretString::from(SECRET.to_string()),
        github_username: "octocat".to_string(),
        ..Config::default()
    }
}

pub fn build_body(task: &str, round: u32, evaluation_url: &str) -> Value {
    json!({
        "email": EMAIL,
        "secret": SECRET,
        "task": task,
        "round": round,
        "nonce": "n",
        "brief": "counter app",
        "evaluation_url": evaluation_url
    })
}

/// Repository host kept in memory
#[derive(Default)]
pub struct FakeHost {
    pub fail_create: bool,
    /// When set, each repository creation waits for a permit
    pub gate: Option<Arc<Semaphore>>,
    pub repos: Mutex<Vec<String>>,
    pub files: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl RepositoryHost for FakeHost {
    fn account(&self) -> &str {
        "octocat"
    }

    async fn create_repository(&self, name: &str, _description: &str) -> Result<RemoteRepository> {
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if self.fail_create {
            anyhow::bail!("GitHub returned 422: name already exists");
        }
        self.repos.lock().unwrap().push(name.to_string());
        Ok(RemoteRepository {
            name: name.to_string(),
            owner: "octocat".to_string(),
            html_url: format!("https://github.com/octocat/{}", name),
        })
    }

    async fn create_file(
        &self,
        _repo: &RemoteRepository,
        path: &str,
        _message: &str,
        content: &str,
    ) -> Result<String> {
        let mut files = self.files.lock().unwrap();
        files.push((path.to_string(), content.to_string()));
        Ok(format!("{:040x}", files.len()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<StatusStore>,
    pub pool: WorkerPool,
}

pub fn create_test_app(host: Arc<dyn RepositoryHost>, worker_config: WorkerConfig) -> TestApp {
    create_test_app_with(test_config(), host, worker_config)
}

pub fn create_test_app_with(
    config: Config,
    host: Arc<dyn RepositoryHost>,
    worker_config: WorkerConfig,
) -> TestApp {
    let store = Arc::new(StatusStore::new(RetentionPolicy::default()));
    let notifier = EvaluationClient::new(RetryPolicy::new(vec![Duration::ZERO])).unwrap();

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(TemplateGenerator::new()),
        Publisher::new(host),
        notifier,
        store.clone(),
    ));
    let pool = WorkerPool::start(worker_config, pipeline);

    let router = create_router(AppState {
        config: Arc::new(config),
        store: store.clone(),
        dispatcher: pool.dispatcher(),
    });

    TestApp {
        router,
        store,
        pool,
    }
}

pub fn default_workers() -> WorkerConfig {
    WorkerConfig {
        num_workers: 2,
        queue_capacity: 8,
    }
}

/// Poll the store until the task's record satisfies `done`
pub async fn wait_for<F>(store: &StatusStore, task: &str, done: F) -> BuildStatusRecord
where
    F: Fn(&BuildStatusRecord) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(record) = store.get(task).await {
            if done(&record) {
                return record;
            }
        }
        assert!(Instant::now() < deadline, "Timed out waiting for task {}", task);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_terminal(store: &StatusStore, task: &str) -> BuildStatusRecord {
    wait_for(store, task, |r| r.status.is_terminal()).await
}

/// Serve `router` on an ephemeral loopback port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Requests seen by the mock GitHub API
#[derive(Default)]
pub struct GitHubLog {
    pub repos: Mutex<Vec<Value>>,
    pub files: Mutex<Vec<(String, Value)>>,
    pub auth_headers: Mutex<Vec<String>>,
}

/// Mock GitHub API. Paths listed in `reject_paths` answer 409.
pub async fn spawn_mock_github(reject_paths: Vec<String>) -> (String, Arc<GitHubLog>) {
    spawn_mock_github_with(false, reject_paths).await
}

/// Mock GitHub API that can also refuse repository creation with 422
pub async fn spawn_mock_github_with(
    reject_create: bool,
    reject_paths: Vec<String>,
) -> (String, Arc<GitHubLog>) {
    let log = Arc::new(GitHubLog::default());
    let reject = Arc::new(reject_paths);

    let router = Router::new()
        .route(
            "/user/repos",
            post(
                move |State((log, _)): State<(Arc<GitHubLog>, Arc<Vec<String>>)>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    record_auth(&log, &headers);
                    if reject_create {
                        return (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            Json(json!({
                                "message": "Repository creation failed.",
                                "errors": [{ "message": "name already exists on this account" }]
                            })),
                        );
                    }
                    let name = body["name"].as_str().unwrap_or_default().to_string();
                    log.repos.lock().unwrap().push(body);
                    (
                        StatusCode::CREATED,
                        Json(json!({
                            "name": name,
                            "html_url": format!("https://github.com/octocat/{}", name),
                            "owner": { "login": "octocat" }
                        })),
                    )
                },
            ),
        )
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            put(
                |State((log, reject)): State<(Arc<GitHubLog>, Arc<Vec<String>>)>,
                 Path((_owner, _repo, path)): Path<(String, String, String)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    record_auth(&log, &headers);
                    if reject.contains(&path) {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "message": "sha wasn't supplied" })),
                        );
                    }
                    let mut files = log.files.lock().unwrap();
                    files.push((path, body));
                    (
                        StatusCode::CREATED,
                        Json(json!({ "commit": { "sha": format!("commit-{}", files.len()) } })),
                    )
                },
            ),
        )
        .with_state((log.clone(), reject));

    (spawn_server(router).await, log)
}

fn record_auth(log: &GitHubLog, headers: &HeaderMap) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    log.auth_headers.lock().unwrap().push(auth);
}

/// Attempts seen by the mock evaluator
#[derive(Default)]
pub struct EvaluatorLog {
    pub attempts: Mutex<Vec<(Instant, Value)>>,
}

/// Mock evaluator answering with `statuses` in turn, then 200
pub async fn spawn_mock_evaluator(statuses: Vec<u16>) -> (String, Arc<EvaluatorLog>) {
    let log = Arc::new(EvaluatorLog::default());
    let statuses = Arc::new(statuses);

    let router = Router::new()
        .route(
            "/notify",
            post(
                |State((log, statuses)): State<(Arc<EvaluatorLog>, Arc<Vec<u16>>)>,
                 Json(body): Json<Value>| async move {
                    let mut attempts = log.attempts.lock().unwrap();
                    let status = statuses.get(attempts.len()).copied().unwrap_or(200);
                    attempts.push((Instant::now(), body));
                    StatusCode::from_u16(status).unwrap()
                },
            ),
        )
        .with_state((log.clone(), statuses));

    (format!("{}/notify", spawn_server(router).await), log)
}
