#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use scenegen_core::job::{JobInput, JobMode, JobOptions};
use scenegen_pipeline::{
    CommandConfig, DevicePreference, GeneratedScene, GenerationBackend, GenerationSession,
    PipelineError,
};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use scenegen_api::config::ServerConfig;
use scenegen_api::router::build_app_router;
use scenegen_api::state::AppState;

/// Prompt that makes [`ScriptedBackend`] fail during generation.
pub const FAIL_GENERATE: &str = "fail-generate";
/// Prompt that makes the generated scene fail to save.
pub const FAIL_SAVE: &str = "fail-save";
/// Prompt that makes generation panic.
pub const PANIC: &str = "panic";

pub const INDEX_HTML: &str = "<!doctype html><title>Scene generator</title>";

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// In-process backend whose behaviour is chosen by the job's input.
///
/// Successful scenes save the bytes `scene:<input>`.
#[derive(Default)]
pub struct ScriptedBackend {
    /// Fail every `initialize` with this description.
    pub init_error: Option<String>,
    /// When set, `generate` waits for a permit before producing anything.
    pub gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn initialize(
        &self,
        _mode: JobMode,
    ) -> Result<Box<dyn GenerationSession>, PipelineError> {
        if let Some(msg) = &self.init_error {
            return Err(PipelineError::Initialization(msg.clone()));
        }
        Ok(Box::new(ScriptedSession {
            gate: self.gate.clone(),
        }))
    }
}

struct ScriptedSession {
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl GenerationSession for ScriptedSession {
    fn device(&self) -> &str {
        "cpu"
    }

    async fn generate(
        &mut self,
        input: &JobInput,
        _options: &JobOptions,
    ) -> Result<Box<dyn GeneratedScene>, PipelineError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match input.as_str() {
            FAIL_GENERATE => Err(PipelineError::Generation(
                "Out of memory while sampling the scene".into(),
            )),
            PANIC => panic!("scripted generation panic"),
            other => Ok(Box::new(ScriptedScene {
                bytes: format!("scene:{other}").into_bytes(),
                fail: other == FAIL_SAVE,
            })),
        }
    }
}

struct ScriptedScene {
    bytes: Vec<u8>,
    fail: bool,
}

#[async_trait]
impl GeneratedScene for ScriptedScene {
    async fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if self.fail {
            return Err(PipelineError::Persistence("No space left on device".into()));
        }
        tokio::fs::write(path, &self.bytes).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub output_dir: PathBuf,
    _dir: TempDir,
}

/// Build a test `ServerConfig` rooted in `dir`.
pub fn test_config(dir: &Path) -> ServerConfig {
    let output_dir = dir.join("output");
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        static_dir: dir.join("static"),
        generator: CommandConfig {
            program: None,
            args: Vec::new(),
            device: DevicePreference::Cpu,
            staging_dir: output_dir.join(".staging"),
        },
        output_dir,
    }
}

/// Build the full application router around `backend`, with a fresh
/// temporary output directory and a static directory holding an index page.
pub fn build_test_app(backend: ScriptedBackend) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.static_dir).unwrap();
    std::fs::write(config.static_dir.join("index.html"), INDEX_HTML).unwrap();

    let state = AppState::new(config.clone(), Arc::new(backend));
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        output_dir: config.output_dir,
        _dir: dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a job and return its id.
pub async fn submit(app: &TestApp, body: serde_json::Value) -> String {
    let response = post_json(app.router.clone(), "/generate", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["job_id"].as_str().unwrap().to_string()
}

/// Poll `GET /status/{id}` until the job is completed or failed.
pub async fn wait_for_terminal(app: &TestApp, job_id: &str) -> serde_json::Value {
    let uri = format!("/status/{job_id}");
    for _ in 0..500 {
        let response = get(app.router.clone(), &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["status"] == "completed" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}
