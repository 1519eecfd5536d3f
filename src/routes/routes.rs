//! Defines the HTTP surface of the credential issuer.
//!
//! ## Structure
//! - `GET /upload-credential?size=&extension=` — issue a presigned upload credential
//! - `GET /healthz` — liveness
//! - `GET /readyz` — readiness (signing provider probe)
//!
//! Every request runs under the overall request timeout; the signing timeout
//! configured on the service is always shorter.

use crate::{
    handlers::{
        credential_handlers::get_upload_credential,
        health_handlers::{healthz, readyz},
    },
    services::credential_service::CredentialService,
};
use axum::{Router, routing::get};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Build and return the router carrying `CredentialService` as shared state.
pub fn routes(request_timeout: Duration) -> Router<CredentialService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/upload-credential", get(get_upload_credential))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
