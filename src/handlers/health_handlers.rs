//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the item backend and the uploads directory

use crate::services::inventory_service::InventoryService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;

/// `GET /healthz`
///
/// Liveness probe; never touches storage.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// 1. Pings the active item backend.
/// 2. Writes, reads and deletes a scratch file in the uploads directory.
///
/// HTTP 200 when all checks pass, 503 otherwise.
pub async fn readyz(State(service): State<InventoryService>) -> impl IntoResponse {
    let repo = service.repository();
    let storage_check = match repo.ping().await {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(e) => {
            tracing::error!("{} backend not ready: {}", repo.backend_name(), e);
            CheckStatus::unavailable()
        }
    };

    let photos_check = match service.photos().probe().await {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(e) => {
            tracing::error!("uploads directory not ready: {}", e);
            CheckStatus::unavailable()
        }
    };

    let overall_ok = storage_check.ok && photos_check.ok;

    let mut checks = BTreeMap::new();
    checks.insert(repo.backend_name(), storage_check);
    checks.insert("photos", photos_check);

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
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    /// Failure details go to the log, not the response.
    fn unavailable() -> Self {
        Self {
            ok: false,
            error: Some("unavailable".into()),
        }
    }
}
