//! HTTP handler for credential issuance.
//!
//! `GET /upload-credential?size=<bytes>&extension=<ext>` returns the signed
//! method/url/headers the client must use for its direct upload.

use crate::{
    errors::IssueError,
    models::upload::{IssuedCredential, UploadRequest},
    services::credential_service::CredentialService,
};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

/// `GET /upload-credential`
///
/// Unparseable query strings (e.g. a non-numeric size) are reported as
/// `invalid_request` rather than axum's plain-text rejection.
pub async fn get_upload_credential(
    State(service): State<CredentialService>,
    query: Result<Query<UploadRequest>, QueryRejection>,
) -> Result<Response, IssueError> {
    let Query(request) = query.map_err(|rejection| IssueError::invalid(rejection.body_text()))?;
    let credential: IssuedCredential = service.issue(&request).await?;

    let mut response = Json(credential).into_response();
    // The body is a bearer credential.
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
