#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use estate_api::auth::{JwtMaker, TokenMaker};
use estate_api::config::AppConfig;
use estate_api::services::FsBlobStore;
use estate_api::testing::{FlakyBlobStore, MemoryStore};
use estate_api::{router, AppState};

pub const SIGNING_KEY: &str = "integration-tests-signing-key-0123456789";
pub const PASSWORD: &str = "correct-horse";

/// The full router over an in-memory store and a temporary upload root
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub tokens: Arc<JwtMaker>,
    pub upload_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `token=<value>` from the Set-Cookie header, ready to send back
    pub fn session_cookie(&self) -> Option<String> {
        let raw = self.headers.get(header::SET_COOKIE)?.to_str().ok()?;
        let pair = raw.split(';').next()?.trim();
        pair.starts_with("token=").then(|| pair.to_string())
    }

    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_failing_puts(|_| false)
    }

    /// Blob writes whose reference matches `filter` fail
    pub fn with_failing_puts(filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(JwtMaker::new(SIGNING_KEY).expect("signing key"));
        let blobs = FlakyBlobStore::new(FsBlobStore::new(upload_dir.path())).failing_puts(filter);

        let mut config = AppConfig::development();
        config.storage.upload_root = upload_dir.path().to_path_buf();

        let state = AppState::new(store.clone(), tokens.clone(), Arc::new(blobs), config);
        Self {
            router: router(state),
            store,
            tokens,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await.context("router failed")?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Result<TestResponse> {
        self.send(build(Method::GET, path, cookie, None, Body::empty())?).await
    }

    pub async fn delete(&self, path: &str, cookie: Option<&str>) -> Result<TestResponse> {
        self.send(build(Method::DELETE, path, cookie, None, Body::empty())?).await
    }

    pub async fn json(&self, method: Method, path: &str, cookie: Option<&str>, body: Value) -> Result<TestResponse> {
        let request = build(
            method,
            path,
            cookie,
            Some("application/json".to_string()),
            Body::from(serde_json::to_vec(&body)?),
        )?;
        self.send(request).await
    }

    pub async fn multipart(&self, method: Method, path: &str, cookie: Option<&str>, form: Form) -> Result<TestResponse> {
        let (content_type, bytes) = form.finish();
        self.send(build(method, path, cookie, Some(content_type), Body::from(bytes))?).await
    }

    /// Registers `username` and returns its session cookie
    pub async fn register(&self, username: &str) -> Result<String> {
        let res = self
            .json(
                Method::POST,
                "/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "phone": "555-0100",
                    "password": PASSWORD,
                    "confirm_password": PASSWORD,
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "register failed: {} {}", res.status, res.body);
        res.session_cookie().context("no session cookie")
    }

    /// Session cookie for any username, bypassing login
    pub fn cookie_for(&self, username: &str) -> String {
        let (token, _) = self.tokens.issue(username, Duration::hours(1)).expect("issue");
        format!("token={}", token)
    }

    pub fn expired_cookie_for(&self, username: &str) -> String {
        let issued = Utc::now() - Duration::hours(2);
        let (token, _) = self
            .tokens
            .issue_at(username, Duration::hours(1), issued)
            .expect("issue");
        format!("token={}", token)
    }

    /// Creates a bare listing through the API and returns its id
    pub async fn create_asset(&self, cookie: &str, price: i64, detail: &str) -> Result<i64> {
        let form = Form::new().text("data", json!({ "asset": { "price": price, "detail": detail } }).to_string());
        let res = self.multipart(Method::POST, "/assets", Some(cookie), form).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {} {}", res.status, res.body);
        res.data()["asset"]["id"].as_i64().context("no asset id")
    }

    pub fn uploads(&self) -> PathBuf {
        self.upload_dir.path().join("uploads")
    }

    /// Names of every blob currently on disk
    pub fn blob_names(&self) -> Vec<String> {
        match std::fs::read_dir(self.uploads()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn blob_exists(&self, reference: &str) -> bool {
        self.upload_dir.path().join(reference).exists()
    }
}

fn build(
    method: Method,
    path: &str,
    cookie: Option<&str>,
    content_type: Option<String>,
    body: Body,
) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    Ok(builder.body(body)?)
}

const BOUNDARY: &str = "estate-test-boundary-7MA4YWxkTrZu0gW";

/// Minimal multipart/form-data encoder
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(value.as_ref().as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        self.body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (format!("multipart/form-data; boundary={}", BOUNDARY), self.body)
    }
}
