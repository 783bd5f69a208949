//! Configuration loading and types for camgate.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct. Each subsection governs a different part of the
//! gateway: listeners, TLS material, credentials, the object store, and
//! logging.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// TLS certificate material for the HTTPS listener.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Basic-Auth settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Object store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
///
/// A port of `0` disables that listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address shared by both listeners.
    #[serde(default = "default_host")]
    pub host: String,

    /// Plaintext HTTP port (0 = disabled).
    #[serde(default)]
    pub http_port: u16,

    /// HTTPS port (0 = disabled).
    #[serde(default = "default_https_port")]
    pub https_port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: 0,
            https_port: default_https_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// PEM files for the HTTPS listener, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Server certificate (may already be a full chain).
    #[serde(default = "default_cert_path")]
    pub cert_path: String,

    /// Private key.
    #[serde(default = "default_key_path")]
    pub key_path: String,

    /// Intermediate certificates appended after `cert_path`.
    #[serde(default)]
    pub chain_path: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            chain_path: None,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JSON file mapping usernames to bcrypt hashes.
    #[serde(default = "default_passwords_file")]
    pub passwords_file: String,

    /// Realm advertised in `WWW-Authenticate`.
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            passwords_file: default_passwords_file(),
            realm: default_realm(),
        }
    }
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `aws` or `memory`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// AWS S3 configuration.
    #[serde(default)]
    pub aws: Option<AwsStorageConfig>,

    /// In-memory store configuration.
    #[serde(default)]
    pub memory: Option<MemoryStorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            aws: None,
            memory: None,
        }
    }
}

/// In-memory store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryStorageConfig {
    /// Directory laid out as `YYYY/MM/DD/<file>`, loaded once at startup.
    pub root: String,
}

/// AWS S3 configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsStorageConfig {
    /// Bucket holding the date-partitioned objects.
    pub bucket: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Key prefix in the bucket, prepended to every `YYYY/MM/DD/...` key.
    #[serde(default)]
    pub prefix: String,
    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: String,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
///
/// Metrics are off by default; when enabled, `/metrics` is served behind
/// the same Basic-Auth gate as everything else.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default)]
    pub metrics: bool,
}

// -- Defaults ----------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_https_port() -> u16 {
    443
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_cert_path() -> String {
    "ssl/fullchain.pem".to_string()
}

fn default_key_path() -> String {
    "ssl/privkey.pem".to_string()
}

fn default_passwords_file() -> String {
    "passwords.json".to_string()
}

fn default_realm() -> String {
    "camgate".to_string()
}

fn default_storage_backend() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(config)
}
