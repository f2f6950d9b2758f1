//! Health & readiness handlers.
//!
//! - GET /health  -> simple liveness ("ok" + server time)
//! - GET /readyz  -> readiness that checks the record store and disk I/O

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /health`
///
/// Liveness check: always returns 200 OK. Never performs I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness check that:
/// 1. Pings the key-value store.
/// 2. Performs a write/read/delete round trip under the storage root.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let store_check = match state.store.ping().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    };

    let disk_check = match state.storage.check_writable().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => CheckStatus::failed(e),
    };

    let overall_ok = store_check.ok && disk_check.ok;

    let mut checks = HashMap::new();
    checks.insert("store", store_check);
    checks.insert("disk", disk_check);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    time: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
