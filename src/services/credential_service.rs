//! CredentialService — the request pipeline shared by all handlers.
//!
//! Validation always runs first; the issuer only ever sees intents the
//! validator produced. The service holds no per-request state, so a single
//! clone is shared across every concurrent request.

use crate::{
    errors::IssueError,
    models::{
        policy::Policy,
        upload::{IssuedCredential, ObjectDescriptor, UploadRequest},
    },
    services::{
        issuer::CredentialIssuer,
        signer::{SigningError, SigningProvider},
        validator::RequestValidator,
    },
};
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tracing::debug;

#[derive(Clone)]
pub struct CredentialService {
    policy: Arc<Policy>,
    validator: RequestValidator,
    issuer: CredentialIssuer,
}

impl CredentialService {
    pub fn new(
        policy: Arc<Policy>,
        provider: Arc<dyn SigningProvider>,
        signing_timeout: Duration,
    ) -> Self {
        Self {
            validator: RequestValidator::new(policy.clone()),
            issuer: CredentialIssuer::new(policy.clone(), provider, signing_timeout),
            policy,
        }
    }

    /// Validate `request` and, only if it passes, issue a credential for it.
    pub async fn issue(&self, request: &UploadRequest) -> Result<IssuedCredential, IssueError> {
        self.issue_at(request, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        request: &UploadRequest,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, IssueError> {
        let intent = self.validator.validate(request, now).inspect_err(|err| {
            debug!(kind = err.kind(), "rejected upload credential request: {}", err);
        })?;
        self.issuer.issue(&intent).await
    }

    /// Sign a throwaway descriptor to prove the provider can produce
    /// credentials. Nothing is uploaded and the result is discarded.
    pub async fn probe(&self) -> Result<(), SigningError> {
        let now = Utc::now();
        let descriptor = ObjectDescriptor {
            bucket: self.policy.bucket().to_string(),
            key: ".readyz-probe".to_string(),
            content_type: "application/octet-stream".to_string(),
            size_bytes: 1,
            encryption: self.policy.encryption().clone(),
            issued_at: now,
            expires_at: now + self.policy.credential_ttl_delta(),
        };
        self.issuer.sign(&descriptor).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::policy::test_policy,
        services::signer::stub::{Behavior, StubProvider},
    };

    fn service(provider: Arc<StubProvider>) -> CredentialService {
        CredentialService::new(Arc::new(test_policy()), provider, Duration::from_secs(1))
    }

    fn request(size: i64, extension: &str) -> UploadRequest {
        UploadRequest {
            size: Some(size),
            extension: Some(extension.to_string()),
        }
    }

    #[tokio::test]
    async fn rejected_requests_never_reach_the_provider() {
        let provider = Arc::new(StubProvider::new(Behavior::Succeed));
        let svc = service(provider.clone());

        let too_large = svc.issue(&request(200 * 1024 * 1024, "jpg")).await;
        assert!(matches!(too_large, Err(IssueError::PayloadTooLarge { .. })));
        let wrong_type = svc.issue(&request(500_000, "png")).await;
        assert!(matches!(wrong_type, Err(IssueError::UnsupportedMediaType { .. })));

        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixed_case_extension_issues_same_content_type() {
        let provider = Arc::new(StubProvider::new(Behavior::Succeed));
        let svc = service(provider);

        let lower = svc.issue(&request(500_000, "jpg")).await.unwrap();
        let upper = svc.issue(&request(500_000, "JPG")).await.unwrap();

        assert_eq!(lower.headers["content-type"], upper.headers["content-type"]);
        assert_ne!(lower.url, upper.url);
    }

    #[tokio::test]
    async fn expiry_is_bounded_by_ttl() {
        let provider = Arc::new(StubProvider::new(Behavior::Succeed));
        let now = Utc::now();
        let credential = service(provider)
            .issue_at(&request(1, "jpe"), now)
            .await
            .unwrap();

        assert!(credential.expires_at <= now + chrono::Duration::minutes(15));
        assert!(credential.url.contains("X-Amz-Expires=900"));
    }

    #[tokio::test]
    async fn probe_reports_provider_health() {
        let ok = service(Arc::new(StubProvider::new(Behavior::Succeed)));
        assert!(ok.probe().await.is_ok());

        let failing = service(Arc::new(StubProvider::new(Behavior::Fail)));
        assert!(failing.probe().await.is_err());
    }
}
