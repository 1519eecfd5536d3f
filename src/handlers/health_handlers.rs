//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the signing provider can sign

use crate::{errors::AppError, services::credential_service::CredentialService};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
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
/// Presigns a throwaway descriptor within the signing timeout. Nothing is
/// uploaded; this only proves credentials and region resolve.
///
/// HTTP 200 when the probe succeeds, HTTP 503 otherwise. The provider
/// error is logged, not returned.
pub async fn readyz(
    State(service): State<CredentialService>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(err) = service.probe().await {
        warn!("readiness probe failed: {}", err);
        return Err(AppError::unavailable("signing provider is not ready"));
    }

    let mut checks = HashMap::new();
    checks.insert("signing", CheckStatus { ok: true });

    Ok((
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ok".into(),
            checks,
        }),
    ))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
}
