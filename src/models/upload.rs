//! Per-request upload types, from untrusted input to issued credential.
//!
//! None of these outlive the request that created them.

use crate::models::policy::EncryptionMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Untrusted query parameters of `GET /upload-credential`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadRequest {
    /// Declared object size in bytes.
    pub size: Option<i64>,

    /// File extension without a leading dot, any case.
    pub extension: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadIntent {
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What a credential authorizes: one object, one content type, one size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub encryption: EncryptionMode,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Header name → values, as the client must send them.
pub type SignedHeaders = BTreeMap<String, Vec<String>>;

/// Raw output of a signing provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: String,
    pub url: String,
    pub headers: SignedHeaders,
}

/// Response body of a successful issuance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedCredential {
    pub method: String,
    pub url: String,
    #[serde(rename = "header")]
    pub headers: SignedHeaders,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCredential {
    /// The signed URL with its query string (and thus its signature) removed,
    /// safe to write to logs.
    pub fn redacted_url(&self) -> &str {
        self.url
            .split_once('?')
            .map_or(self.url.as_str(), |(base, _)| base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(url: &str) -> IssuedCredential {
        IssuedCredential {
            method: "PUT".into(),
            url: url.into(),
            headers: SignedHeaders::new(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn redacted_url_drops_query_string() {
        let cred = credential("http://localhost:4566/bucket/a.jpg?X-Amz-Signature=abc");
        assert_eq!(cred.redacted_url(), "http://localhost:4566/bucket/a.jpg");

        let plain = credential("http://localhost:4566/bucket/a.jpg");
        assert_eq!(plain.redacted_url(), "http://localhost:4566/bucket/a.jpg");
    }

    #[test]
    fn serializes_headers_under_header_key() {
        let mut cred = credential("http://example.test/k");
        cred.headers
            .insert("content-type".into(), vec!["image/jpeg".into()]);

        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["method"], "PUT");
        assert_eq!(json["header"]["content-type"][0], "image/jpeg");
        assert!(json.get("headers").is_none());
    }
}
