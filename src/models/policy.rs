//! Process-wide issuance policy.
//!
//! A `Policy` is built once at startup from configuration and shared
//! read-only by the validator and issuer. Construction is the only place
//! where consistency is checked; once a `Policy` exists every allowed
//! extension is guaranteed to resolve to a content type.

use crate::models::content_type;
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::{collections::HashMap, fmt, time::Duration};
use thiserror::Error;

/// Longest lifetime a SigV4 presigned URL may carry.
pub const MAX_CREDENTIAL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one allowed extension is required")]
    NoAllowedExtensions,
    #[error("allowed extension `{0}` must be non-empty ASCII alphanumeric")]
    InvalidExtension(String),
    #[error("allowed extension `{0}` has no known content type")]
    MissingContentType(String),
    #[error("maximum upload size must be greater than zero")]
    ZeroMaxSize,
    #[error("credential TTL {0:?} must be greater than zero and at most 7 days")]
    InvalidTtl(Duration),
    #[error("bucket name must not be empty")]
    EmptyBucket,
    #[error("unknown encryption mode `{0}` (expected none, aes256 or aws-kms)")]
    UnknownEncryptionMode(String),
    #[error("a KMS key id was configured but encryption mode is `{0}`")]
    KmsKeyWithoutKms(EncryptionMode),
    #[error("signing timeout {signing:?} must be non-zero and shorter than the request timeout {request:?}")]
    SigningTimeout { signing: Duration, request: Duration },
}

/// Server-side encryption directive attached to every issued upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionMode {
    None,
    Aes256,
    AwsKms { key_id: Option<String> },
}

impl EncryptionMode {
    /// Parse a configured mode name, attaching the optional KMS key id.
    pub fn parse(mode: &str, kms_key_id: Option<String>) -> Result<Self, ConfigError> {
        let parsed = match mode.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "aes256" => Self::Aes256,
            "aws-kms" | "aws:kms" => {
                return Ok(Self::AwsKms {
                    key_id: kms_key_id.filter(|id| !id.trim().is_empty()),
                });
            }
            other => return Err(ConfigError::UnknownEncryptionMode(other.to_string())),
        };

        match kms_key_id {
            Some(id) if !id.trim().is_empty() => Err(ConfigError::KmsKeyWithoutKms(parsed)),
            _ => Ok(parsed),
        }
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Aes256 => write!(f, "aes256"),
            Self::AwsKms { .. } => write!(f, "aws-kms"),
        }
    }
}

/// Raw policy values, as read from configuration.
#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub max_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub credential_ttl: Duration,
    pub bucket: String,
    pub key_prefix: String,
    pub encryption: EncryptionMode,
}

/// Validated, immutable issuance policy.
#[derive(Debug, Clone)]
pub struct Policy {
    max_size_bytes: u64,
    allowed_extensions: Vec<String>,
    content_types: HashMap<String, &'static str>,
    credential_ttl: Duration,
    credential_ttl_delta: ChronoDuration,
    bucket: String,
    key_prefix: String,
    encryption: EncryptionMode,
}

impl TryFrom<PolicySettings> for Policy {
    type Error = ConfigError;

    fn try_from(settings: PolicySettings) -> Result<Self, Self::Error> {
        if settings.max_size_bytes == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        if settings.credential_ttl.is_zero() || settings.credential_ttl > MAX_CREDENTIAL_TTL {
            return Err(ConfigError::InvalidTtl(settings.credential_ttl));
        }
        let credential_ttl_delta = ChronoDuration::from_std(settings.credential_ttl)
            .map_err(|_| ConfigError::InvalidTtl(settings.credential_ttl))?;
        let bucket = settings.bucket.trim().to_string();
        if bucket.is_empty() {
            return Err(ConfigError::EmptyBucket);
        }

        let mut allowed_extensions = Vec::with_capacity(settings.allowed_extensions.len());
        let mut content_types = HashMap::new();
        for raw in &settings.allowed_extensions {
            let ext = raw.trim().to_ascii_lowercase();
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidExtension(raw.clone()));
            }
            if content_types.contains_key(&ext) {
                continue;
            }
            let content_type = content_type::lookup(&ext)
                .ok_or_else(|| ConfigError::MissingContentType(ext.clone()))?;
            content_types.insert(ext.clone(), content_type);
            allowed_extensions.push(ext);
        }
        if allowed_extensions.is_empty() {
            return Err(ConfigError::NoAllowedExtensions);
        }

        Ok(Self {
            max_size_bytes: settings.max_size_bytes,
            allowed_extensions,
            content_types,
            credential_ttl: settings.credential_ttl,
            credential_ttl_delta,
            bucket,
            key_prefix: settings.key_prefix.trim_matches('/').to_string(),
            encryption: settings.encryption,
        })
    }
}

impl Policy {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Allowed extensions, lower-cased, in configured order.
    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn credential_ttl(&self) -> Duration {
        self.credential_ttl
    }

    /// Same as [`Policy::credential_ttl`], for timestamp arithmetic.
    pub fn credential_ttl_delta(&self) -> ChronoDuration {
        self.credential_ttl_delta
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn encryption(&self) -> &EncryptionMode {
        &self.encryption
    }

    /// Content type for an already-normalized extension, `None` when the
    /// extension is not allowed.
    pub fn content_type_for(&self, extension: &str) -> Option<&'static str> {
        self.content_types.get(extension).copied()
    }
}

#[cfg(test)]
pub(crate) fn test_policy() -> Policy {
    Policy::try_from(PolicySettings {
        max_size_bytes: 100 * 1024 * 1024,
        allowed_extensions: vec!["jpg".into(), "jpeg".into(), "jpe".into()],
        credential_ttl: Duration::from_secs(15 * 60),
        bucket: "test-bucket".into(),
        key_prefix: "uploads".into(),
        encryption: EncryptionMode::Aes256,
    })
    .expect("test policy is consistent")
}
