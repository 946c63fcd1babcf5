//! HTTP interface tests against a live listener on an ephemeral port.

mod common;

use common::*;
use lafal::server::protocol::{ErrorResponse, HealthResponse};
use lafal::server::{self, AppState};
use lafal::{
    ApiKeyAuthenticator, HistoryStore, MemoryHistoryStore, MfccExtractor, Pipeline,
    PipelineConfig, RandomForest,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

const API_KEY: &str = "test-key";

struct TestServer {
    base: String,
    history: Arc<MemoryHistoryStore>,
    staging: TempDir,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start(max_upload_bytes: usize) -> TestServer {
    let staging = tempfile::tempdir().unwrap();
    let history = Arc::new(MemoryHistoryStore::new());
    let store: Arc<dyn HistoryStore> = history.clone();
    let pipeline = Pipeline::new(
        Arc::new(MfccExtractor::default()),
        Arc::new(RandomForest::from_artifact(&energy_forest()).unwrap()),
        store,
    )
    .with_config(PipelineConfig {
        staging_dir: staging.path().to_path_buf(),
        ..Default::default()
    });

    let state = AppState::new(
        Arc::new(pipeline),
        Arc::new(ApiKeyAuthenticator::new(API_KEY)),
        max_upload_bytes,
    );
    let listener = server::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        server::serve(listener, server::router(state), async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        history,
        staging,
        shutdown: Some(tx),
    }
}

fn audio_part(bytes: Vec<u8>) -> Part {
    Part::bytes(bytes)
        .file_name("utterance.wav")
        .mime_str("audio/wav")
        .unwrap()
}

async fn post_predict(server: &TestServer, form: Form, key: Option<&str>) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(format!("{}/predict", server.base))
        .multipart(form);
    if let Some(key) = key {
        request = request.header("X-API-KEY", key);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn predict_correct_utterance() {
    let server = start(10 * 1024 * 1024).await;
    let form = Form::new()
        .text("email", "a@example.com")
        .part("audio", audio_part(tone_wav()));

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], "Benar");
    assert_eq!(body["confidence"], serde_json::json!([0.2, 0.8]));

    assert_eq!(server.history.records_for("a@example.com").await.len(), 1);
    assert_eq!(entries(server.staging.path()), 0);
}

#[tokio::test]
async fn predict_incorrect_utterance() {
    let server = start(10 * 1024 * 1024).await;
    let form = Form::new()
        .text("email", "b@example.com")
        .text("note", "ignored")
        .part("audio", audio_part(silent_wav()));

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], "Salah");
    assert_eq!(body["confidence"], serde_json::json!([0.9, 0.1]));
}

#[tokio::test]
async fn missing_or_wrong_key_is_forbidden() {
    let server = start(10 * 1024 * 1024).await;

    for key in [None, Some("wrong-key")] {
        let form = Form::new()
            .text("email", "a@example.com")
            .part("audio", audio_part(tone_wav()));
        let response = post_predict(&server, form, key).await;
        assert_eq!(response.status(), 403);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.error, "Unauthorized");
    }
    assert!(server.history.records().await.is_empty());
}

#[tokio::test]
async fn missing_email_is_bad_request() {
    let server = start(10 * 1024 * 1024).await;
    let form = Form::new().part("audio", audio_part(tone_wav()));

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 400);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Audio file and email are required");
    assert_eq!(body.kind, "validation");
}

#[tokio::test]
async fn missing_audio_is_bad_request() {
    let server = start(10 * 1024 * 1024).await;
    let form = Form::new().text("email", "a@example.com");

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn audio_sent_as_plain_field_is_bad_request() {
    let server = start(10 * 1024 * 1024).await;
    let form = Form::new()
        .text("email", "a@example.com")
        .part("audio", Part::bytes(tone_wav()));

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 400);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Audio file and email are required");
    assert!(server.history.records().await.is_empty());
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let server = start(10 * 1024 * 1024).await;
    let response = reqwest::Client::new()
        .post(format!("{}/predict", server.base))
        .header("X-API-KEY", API_KEY)
        .body("email=a@example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn empty_audio_is_server_error() {
    let server = start(10 * 1024 * 1024).await;
    let form = Form::new()
        .text("email", "d@example.com")
        .part("audio", audio_part(Vec::new()));

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 500);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.kind, "audio_decode");
    assert!(server.history.records().await.is_empty());
    assert_eq!(entries(server.staging.path()), 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let server = start(4 * 1024).await;
    let form = Form::new()
        .text("email", "a@example.com")
        .part("audio", audio_part(tone_wav()));

    let response = post_predict(&server, form, Some(API_KEY)).await;
    assert_eq!(response.status(), 413);
    assert!(server.history.records().await.is_empty());
}

#[tokio::test]
async fn health_needs_no_key() {
    let server = start(10 * 1024 * 1024).await;
    let response = reqwest::get(format!("{}/health", server.base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: HealthResponse = response.json().await.unwrap();
    assert_eq!(body.status, "ok");
    assert_eq!(body.model_version, "1.6.0-test");
    assert_eq!(body.n_features, 13);
    assert!(body.service_version.starts_with(env!("CARGO_PKG_VERSION")));
}
