//! Common routes: health, readiness, version.

use crate::externals::Externals;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    externals: BTreeMap<&'static str, String>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(externals): State<Externals>) -> (StatusCode, Json<ReadyBody>) {
    let mut degraded = false;
    let mut report = BTreeMap::new();
    for (name, err) in externals.check_all().await {
        match err {
            Some(e) => {
                tracing::warn!(external = name, error = %e, "readiness check failed");
                degraded = true;
                report.insert(name, "unavailable".to_string());
            }
            None => {
                report.insert(name, "ok".to_string());
            }
        }
    }
    let (code, status) = if degraded {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "ok")
    };
    (code, Json(ReadyBody { status, externals: report }))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, GET /ready (checks every external), GET /version.
pub fn common_routes(externals: Externals) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(externals)
}
