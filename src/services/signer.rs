//! Object Storage Signing Provider.
//!
//! The issuer only sees the [`SigningProvider`] trait. [`S3SigningProvider`]
//! implements it with the AWS SDK presigner: signing happens locally from
//! the resolved credentials, no object bytes are ever involved.

use crate::models::{
    policy::EncryptionMode,
    upload::{ObjectDescriptor, SignedHeaders, SignedRequest},
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, meta::region::RegionProviderChain};
use aws_sdk_s3::{
    Client,
    config::Region,
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    types::ServerSideEncryption,
};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::debug;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid presigning request: {0}")]
    Configuration(String),
    #[error("presigning failed: {0}")]
    Presigning(String),
    #[error("signing provider did not answer within {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Produce a method/url/headers triple authorizing an upload of exactly
    /// `descriptor`, valid for `ttl` from `descriptor.issued_at`.
    async fn sign(
        &self,
        descriptor: &ObjectDescriptor,
        ttl: Duration,
    ) -> Result<SignedRequest, SigningError>;
}

/// Where the S3 client should point. Credentials always come from the
/// default provider chain.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub force_path_style: bool,
}

#[derive(Clone, Debug)]
pub struct S3SigningProvider {
    client: Client,
}

impl S3SigningProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration plus `settings`.
    pub async fn connect(settings: &S3Settings) -> Self {
        let region_provider = match settings.region.as_deref() {
            Some(region) => RegionProviderChain::first_try(Region::new(region.to_string())),
            None => RegionProviderChain::default_provider(),
        }
        .or_else(Region::new(DEFAULT_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Some(endpoint) = settings.endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.force_path_style)
            .build();
        debug!(
            "S3 client configured (endpoint: {:?}, path style: {})",
            settings.endpoint, settings.force_path_style
        );

        Self::new(Client::from_conf(s3_config))
    }
}

#[async_trait]
impl SigningProvider for S3SigningProvider {
    async fn sign(
        &self,
        descriptor: &ObjectDescriptor,
        ttl: Duration,
    ) -> Result<SignedRequest, SigningError> {
        let presigning = PresigningConfig::builder()
            .start_time(SystemTime::from(descriptor.issued_at))
            .expires_in(ttl)
            .build()
            .map_err(|e| SigningError::Configuration(e.to_string()))?;
        let content_length = i64::try_from(descriptor.size_bytes)
            .map_err(|_| SigningError::Configuration("object size overflows i64".into()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&descriptor.bucket)
            .key(&descriptor.key)
            .content_type(&descriptor.content_type)
            .content_length(content_length);
        request = match &descriptor.encryption {
            EncryptionMode::None => request,
            EncryptionMode::Aes256 => request.server_side_encryption(ServerSideEncryption::Aes256),
            EncryptionMode::AwsKms { key_id } => request
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .set_ssekms_key_id(key_id.clone()),
        };

        let presigned = request
            .presigned(presigning)
            .await
            .map_err(|e| SigningError::Presigning(DisplayErrorContext(&e).to_string()))?;

        let mut headers = SignedHeaders::new();
        for (name, value) in presigned.headers() {
            headers
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }

        Ok(SignedRequest {
            method: presigned.method().to_string(),
            url: presigned.uri().to_string(),
            headers,
        })
    }
}
