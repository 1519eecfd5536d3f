//! Request validation: untrusted `UploadRequest` in, `UploadIntent` out.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. size present and positive
//! 2. size within the policy ceiling
//! 3. extension present and allowed (case-insensitive)
//!
//! Validation does no I/O. The only non-deterministic part of a successful
//! result is the freshly generated object key.

use crate::{
    errors::IssueError,
    models::{
        policy::Policy,
        upload::{UploadIntent, UploadRequest},
    },
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct RequestValidator {
    policy: Arc<Policy>,
}

impl RequestValidator {
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }

    /// Validate `request` as of `now`, producing an intent that expires at
    /// `now + credential TTL`.
    pub fn validate(
        &self,
        request: &UploadRequest,
        now: DateTime<Utc>,
    ) -> Result<UploadIntent, IssueError> {
        let size_bytes = self.check_size(request.size)?;
        let (extension, content_type) = self.check_extension(request.extension.as_deref())?;

        Ok(UploadIntent {
            object_key: self.object_key(&extension),
            content_type: content_type.to_string(),
            size_bytes,
            issued_at: now,
            expires_at: now + self.policy.credential_ttl_delta(),
        })
    }

    fn check_size(&self, size: Option<i64>) -> Result<u64, IssueError> {
        let size = size.ok_or_else(|| IssueError::invalid("size is required"))?;
        let size = u64::try_from(size)
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| IssueError::invalid("size must be a positive integer"))?;

        if size > self.policy.max_size_bytes() {
            return Err(IssueError::PayloadTooLarge {
                limit: self.policy.max_size_bytes(),
            });
        }
        Ok(size)
    }

    fn check_extension(
        &self,
        extension: Option<&str>,
    ) -> Result<(String, &'static str), IssueError> {
        let normalized = extension
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IssueError::invalid("extension is required"))?;

        match self.policy.content_type_for(&normalized) {
            Some(content_type) => Ok((normalized, content_type)),
            None => Err(IssueError::UnsupportedMediaType {
                allowed: self.policy.allowed_extensions().to_vec(),
            }),
        }
    }

    /// `<prefix>/<uuid>.<ext>`, one random identifier per request.
    fn object_key(&self, extension: &str) -> String {
        let id = Uuid::new_v4().simple();
        match self.policy.key_prefix() {
            "" => format!("{id}.{extension}"),
            prefix => format!("{prefix}/{id}.{extension}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::{EncryptionMode, PolicySettings, test_policy};
    use std::time::Duration;

    fn validator() -> RequestValidator {
        RequestValidator::new(Arc::new(test_policy()))
    }

    fn request(size: Option<i64>, extension: Option<&str>) -> UploadRequest {
        UploadRequest {
            size,
            extension: extension.map(str::to_string),
        }
    }

    #[test]
    fn accepts_small_jpeg() {
        let now = Utc::now();
        let intent = validator()
            .validate(&request(Some(500_000), Some("jpg")), now)
            .unwrap();

        assert_eq!(intent.content_type, "image/jpeg");
        assert_eq!(intent.size_bytes, 500_000);
        assert_eq!(intent.issued_at, now);
        assert_eq!(intent.expires_at, now + chrono::Duration::minutes(15));
        assert!(intent.object_key.starts_with("uploads/"));
        assert!(intent.object_key.ends_with(".jpg"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let v = validator();
        let now = Utc::now();
        let lower = v.validate(&request(Some(500_000), Some("jpg")), now).unwrap();
        let upper = v.validate(&request(Some(500_000), Some("JPG")), now).unwrap();

        assert_eq!(lower.content_type, upper.content_type);
        assert!(upper.object_key.ends_with(".jpg"));
    }

    #[test]
    fn oversized_request_reports_limit() {
        let err = validator()
            .validate(&request(Some(200 * 1024 * 1024), Some("jpg")), Utc::now())
            .unwrap_err();

        assert_eq!(
            err,
            IssueError::PayloadTooLarge {
                limit: 100 * 1024 * 1024
            }
        );
    }

    #[test]
    fn size_exactly_at_limit_is_accepted() {
        let intent = validator()
            .validate(&request(Some(100 * 1024 * 1024), Some("jpeg")), Utc::now())
            .unwrap();
        assert_eq!(intent.size_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn disallowed_extension_reports_allowed_set() {
        let err = validator()
            .validate(&request(Some(500_000), Some("png")), Utc::now())
            .unwrap_err();

        assert_eq!(
            err,
            IssueError::UnsupportedMediaType {
                allowed: vec!["jpg".into(), "jpeg".into(), "jpe".into()]
            }
        );
    }

    #[test]
    fn missing_or_non_positive_size_is_invalid() {
        let v = validator();
        for size in [None, Some(0), Some(-1), Some(i64::MIN)] {
            let err = v.validate(&request(size, Some("jpg")), Utc::now()).unwrap_err();
            assert!(matches!(err, IssueError::InvalidRequest(_)), "size {size:?}");
        }
    }

    #[test]
    fn missing_extension_is_invalid() {
        let v = validator();
        for ext in [None, Some(""), Some("   ")] {
            let err = v.validate(&request(Some(10), ext), Utc::now()).unwrap_err();
            assert!(matches!(err, IssueError::InvalidRequest(_)), "extension {ext:?}");
        }
    }

    #[test]
    fn size_is_checked_before_extension() {
        let err = validator()
            .validate(&request(Some(200 * 1024 * 1024), Some("png")), Utc::now())
            .unwrap_err();
        assert!(matches!(err, IssueError::PayloadTooLarge { .. }));
    }

    #[test]
    fn repeated_validation_gives_same_decision() {
        let v = validator();
        let now = Utc::now();
        let cases = [
            request(Some(500_000), Some("jpg")),
            request(Some(200 * 1024 * 1024), Some("jpg")),
            request(Some(500_000), Some("png")),
            request(None, Some("jpg")),
        ];

        for req in &cases {
            let first = v.validate(req, now).map(|i| (i.content_type, i.size_bytes));
            let second = v.validate(req, now).map(|i| (i.content_type, i.size_bytes));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn object_keys_are_unique_per_request() {
        let v = validator();
        let req = request(Some(1), Some("jpg"));
        let a = v.validate(&req, Utc::now()).unwrap();
        let b = v.validate(&req, Utc::now()).unwrap();
        assert_ne!(a.object_key, b.object_key);
    }

    #[test]
    fn empty_prefix_yields_bare_key() {
        let policy = Policy::try_from(PolicySettings {
            max_size_bytes: 10,
            allowed_extensions: vec!["png".into()],
            credential_ttl: Duration::from_secs(60),
            bucket: "b".into(),
            key_prefix: String::new(),
            encryption: EncryptionMode::None,
        })
        .unwrap();
        let intent = RequestValidator::new(Arc::new(policy))
            .validate(&request(Some(5), Some("PNG")), Utc::now())
            .unwrap();

        assert!(!intent.object_key.contains('/'));
        assert!(intent.object_key.ends_with(".png"));
        assert_eq!(intent.content_type, "image/png");
    }

    #[test]
    fn every_allowed_extension_resolves() {
        let v = validator();
        for ext in test_policy().allowed_extensions() {
            let intent = v.validate(&request(Some(1), Some(ext)), Utc::now()).unwrap();
            assert!(!intent.content_type.is_empty());
        }
    }
}
