//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p mediaform-api`.

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use mediaform_api::setup::routes;
use mediaform_api::AppState;
use mediaform_core::Config;
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server, state, and the storage directory it owns.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Upload `data` and return the new asset id
    pub async fn upload_ok(&self, kind: &str, filename: &str, mime: &str, data: Vec<u8>) -> String {
        let response = upload(&self.server, kind, filename, mime, data).await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        let body: serde_json::Value = response.json();
        body["id"].as_str().unwrap().to_string()
    }
}

/// Setup test app with default configuration and temp-dir storage.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app after letting the caller adjust the configuration.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    let mut config = Config::default();
    config.local_storage_path = temp_dir.path().to_string_lossy().into_owned();
    configure(&mut config);

    let storage = mediaform_storage::create_storage(&config)
        .await
        .expect("create storage");
    let state = Arc::new(AppState::new(config.clone(), storage));
    let router = routes::setup_routes(&config, state.clone()).expect("build router");
    let server = TestServer::new(router).expect("start test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// POST /upload with a `file` part and a `type` field
pub async fn upload(
    server: &TestServer,
    kind: &str,
    filename: &str,
    mime: &str,
    data: Vec<u8>,
) -> TestResponse {
    let form = MultipartForm::new().add_text("type", kind.to_string()).add_part(
        "file",
        Part::bytes(data)
            .file_name(filename.to_string())
            .mime_type(mime.to_string()),
    );
    server.post("/upload").multipart(form).await
}
