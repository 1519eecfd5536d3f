//! Credential issuance: validated intent in, signed credential out.

use crate::{
    errors::IssueError,
    models::{
        policy::Policy,
        upload::{IssuedCredential, ObjectDescriptor, SignedRequest, UploadIntent},
    },
    services::signer::{SigningError, SigningProvider},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

#[derive(Clone)]
pub struct CredentialIssuer {
    policy: Arc<Policy>,
    provider: Arc<dyn SigningProvider>,
    signing_timeout: Duration,
}

impl CredentialIssuer {
    pub fn new(
        policy: Arc<Policy>,
        provider: Arc<dyn SigningProvider>,
        signing_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            provider,
            signing_timeout,
        }
    }

    /// Storage-object descriptor for `intent` under the current policy.
    pub fn descriptor(&self, intent: &UploadIntent) -> ObjectDescriptor {
        ObjectDescriptor {
            bucket: self.policy.bucket().to_string(),
            key: intent.object_key.clone(),
            content_type: intent.content_type.clone(),
            size_bytes: intent.size_bytes,
            encryption: self.policy.encryption().clone(),
            issued_at: intent.issued_at,
            expires_at: intent.expires_at,
        }
    }

    /// Ask the provider to sign `descriptor`, bounded by the signing timeout.
    pub async fn sign(
        &self,
        descriptor: &ObjectDescriptor,
    ) -> Result<SignedRequest, SigningError> {
        let ttl = self.policy.credential_ttl();
        match tokio::time::timeout(self.signing_timeout, self.provider.sign(descriptor, ttl)).await
        {
            Ok(result) => result,
            Err(_) => Err(SigningError::Timeout(self.signing_timeout)),
        }
    }

    /// Issue a credential for an intent produced by the validator.
    ///
    /// The provider's method, URL and headers are returned untouched; any
    /// rewrite would break the signature.
    pub async fn issue(&self, intent: &UploadIntent) -> Result<IssuedCredential, IssueError> {
        let descriptor = self.descriptor(intent);

        let signed = self.sign(&descriptor).await.map_err(|err| {
            error!(
                bucket = %descriptor.bucket,
                key = %descriptor.key,
                "signing provider failed: {}",
                err
            );
            IssueError::SigningFailed
        })?;

        let credential = IssuedCredential {
            method: signed.method,
            url: signed.url,
            headers: signed.headers,
            expires_at: descriptor.expires_at,
        };
        info!(
            bucket = %descriptor.bucket,
            key = %descriptor.key,
            content_type = %descriptor.content_type,
            size = descriptor.size_bytes,
            expires_at = %credential.expires_at,
            url = credential.redacted_url(),
            "issued upload credential"
        );

        Ok(credential)
    }
}
