#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use scaffold_sdk::externals::DEFAULT_STARTUP_TIMEOUT;
use scaffold_sdk::{AppConfig, External, Externals, JsonFileExternal, Store};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A JSON-file store in a fresh temp directory, registered as an external.
pub struct TestStore {
    pub dir: TempDir,
    pub externals: Externals,
    pub store: Arc<dyn Store>,
}

pub async fn json_store() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let external: Arc<dyn External> = Arc::new(JsonFileExternal::new(dir.path().join("db.json")));
    let externals = Externals::register(vec![external], DEFAULT_STARTUP_TIMEOUT)
        .await
        .unwrap();
    let store: Arc<dyn Store> = externals.get::<JsonFileExternal>().unwrap().store().unwrap();
    TestStore { dir, externals, store }
}

pub fn config() -> AppConfig {
    AppConfig::default()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> TestResponse {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    TestResponse { status, headers, body }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> TestResponse {
    send(app, Method::POST, uri, Some(body), None).await
}
