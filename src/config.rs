use crate::{
    models::policy::{ConfigError, EncryptionMode, Policy, PolicySettings},
    services::signer::S3Settings,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub force_path_style: bool,
    pub bucket: String,
    pub key_prefix: String,
    pub max_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub credential_ttl: Duration,
    pub encryption: String,
    pub kms_key_id: Option<String>,
    pub request_timeout: Duration,
    pub signing_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Presigned upload credential service")]
pub struct Args {
    /// Host to bind to (overrides UPLOAD_CREDENTIAL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UPLOAD_CREDENTIAL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Object storage endpoint, e.g. http://localhost:4566 (overrides UPLOAD_CREDENTIAL_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Storage region (overrides UPLOAD_CREDENTIAL_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Use path-style bucket addressing (overrides UPLOAD_CREDENTIAL_FORCE_PATH_STYLE)
    #[arg(long)]
    pub force_path_style: Option<bool>,

    /// Target bucket (overrides UPLOAD_CREDENTIAL_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Prefix of generated object keys (overrides UPLOAD_CREDENTIAL_KEY_PREFIX)
    #[arg(long)]
    pub key_prefix: Option<String>,

    /// Largest declared upload size in bytes (overrides UPLOAD_CREDENTIAL_MAX_SIZE_BYTES)
    #[arg(long)]
    pub max_size_bytes: Option<u64>,

    /// Comma-separated extension whitelist (overrides UPLOAD_CREDENTIAL_ALLOWED_EXTENSIONS)
    #[arg(long)]
    pub allowed_extensions: Option<String>,

    /// Credential lifetime in seconds (overrides UPLOAD_CREDENTIAL_TTL_SECS)
    #[arg(long)]
    pub credential_ttl_secs: Option<u64>,

    /// Server-side encryption: none, aes256 or aws-kms (overrides UPLOAD_CREDENTIAL_ENCRYPTION)
    #[arg(long)]
    pub encryption: Option<String>,

    /// KMS key id for aws-kms encryption (overrides UPLOAD_CREDENTIAL_KMS_KEY_ID)
    #[arg(long)]
    pub kms_key_id: Option<String>,

    /// Overall request deadline in milliseconds (overrides UPLOAD_CREDENTIAL_REQUEST_TIMEOUT_MS)
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Signing provider deadline in milliseconds (overrides UPLOAD_CREDENTIAL_SIGNING_TIMEOUT_MS)
    #[arg(long)]
    pub signing_timeout_ms: Option<u64>,
}

const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_TTL_SECS: u64 = 15 * 60;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse(), |key| env::var(key))
    }

    /// Merge CLI args over values looked up by `lookup`, over defaults.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let text = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };
        let parsed = |key: &str| -> Result<Option<u64>> { parse_opt(key, text(key)?) };

        let endpoint = args
            .endpoint
            .or(text("UPLOAD_CREDENTIAL_ENDPOINT")?)
            .filter(|e| !e.trim().is_empty());
        let force_path_style = match args.force_path_style {
            Some(value) => value,
            None => parse_opt("UPLOAD_CREDENTIAL_FORCE_PATH_STYLE", text("UPLOAD_CREDENTIAL_FORCE_PATH_STYLE")?)?
                .unwrap_or(endpoint.is_some()),
        };
        let allowed_extensions = args
            .allowed_extensions
            .or(text("UPLOAD_CREDENTIAL_ALLOWED_EXTENSIONS")?)
            .unwrap_or_else(|| "jpg,jpeg,jpe".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let request_timeout_ms = match args.request_timeout_ms {
            Some(ms) => ms,
            None => parsed("UPLOAD_CREDENTIAL_REQUEST_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        };
        let signing_timeout_ms = match args.signing_timeout_ms {
            Some(ms) => ms,
            None => parsed("UPLOAD_CREDENTIAL_SIGNING_TIMEOUT_MS")?
                .unwrap_or(request_timeout_ms * 4 / 5),
        };

        Ok(Self {
            host: args
                .host
                .or(text("UPLOAD_CREDENTIAL_HOST")?)
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: match args.port {
                Some(port) => port,
                None => parse_opt("UPLOAD_CREDENTIAL_PORT", text("UPLOAD_CREDENTIAL_PORT")?)?
                    .unwrap_or(8080),
            },
            endpoint,
            region: args
                .region
                .or(text("UPLOAD_CREDENTIAL_REGION")?)
                .filter(|r| !r.trim().is_empty()),
            force_path_style,
            bucket: args
                .bucket
                .or(text("UPLOAD_CREDENTIAL_BUCKET")?)
                .unwrap_or_else(|| "uploads".into()),
            key_prefix: args
                .key_prefix
                .or(text("UPLOAD_CREDENTIAL_KEY_PREFIX")?)
                .unwrap_or_else(|| "uploads".into()),
            max_size_bytes: match args.max_size_bytes {
                Some(size) => size,
                None => parsed("UPLOAD_CREDENTIAL_MAX_SIZE_BYTES")?
                    .unwrap_or(DEFAULT_MAX_SIZE_BYTES),
            },
            allowed_extensions,
            credential_ttl: Duration::from_secs(match args.credential_ttl_secs {
                Some(secs) => secs,
                None => parsed("UPLOAD_CREDENTIAL_TTL_SECS")?.unwrap_or(DEFAULT_TTL_SECS),
            }),
            encryption: args
                .encryption
                .or(text("UPLOAD_CREDENTIAL_ENCRYPTION")?)
                .unwrap_or_else(|| "aes256".into()),
            kms_key_id: args.kms_key_id.or(text("UPLOAD_CREDENTIAL_KMS_KEY_ID")?),
            request_timeout: Duration::from_millis(request_timeout_ms),
            signing_timeout: Duration::from_millis(signing_timeout_ms),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the immutable issuance policy and check the timeout ordering.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        if self.signing_timeout.is_zero() || self.signing_timeout >= self.request_timeout {
            return Err(ConfigError::SigningTimeout {
                signing: self.signing_timeout,
                request: self.request_timeout,
            });
        }

        Policy::try_from(PolicySettings {
            max_size_bytes: self.max_size_bytes,
            allowed_extensions: self.allowed_extensions.clone(),
            credential_ttl: self.credential_ttl,
            bucket: self.bucket.clone(),
            key_prefix: self.key_prefix.clone(),
            encryption: EncryptionMode::parse(&self.encryption, self.kms_key_id.clone())?,
        })
    }

    pub fn s3(&self) -> S3Settings {
        S3Settings {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

fn parse_opt<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, v))
        })
        .transpose()
}
