//! Configuration types for engine construction.

use crate::{Result, VaultenvError};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default prefix applied to derived role names.
pub const DEFAULT_ROLE_PREFIX: &str = "mesos";

/// Default root under which per-workload secrets live.
pub const DEFAULT_SECRETS_PATH: &str = "secrets";

/// An AppRole role-id/secret-id pair.
///
/// `Debug` output never includes the values.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// AppRole role-id
    pub role_id: String,
    /// AppRole secret-id
    pub secret_id: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            secret_id: secret_id.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("role_id", &"<redacted>")
            .field("secret_id", &"<redacted>")
            .finish()
    }
}

/// TLS material for talking to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// Verify the server certificate (default: true)
    #[serde(default)]
    pub verify: Option<bool>,

    /// Extra PEM-encoded CA certificate to trust
    #[serde(default, alias = "pem_file")]
    pub ca_pem_file: Option<String>,

    /// PEM-encoded client certificate for mutual TLS
    #[serde(default)]
    pub client_pem_file: Option<String>,

    /// PEM-encoded private key matching `client_pem_file`
    #[serde(default)]
    pub client_key_pem_file: Option<String>,
}

/// Configuration for the secret resolution engine.
///
/// Use the builder pattern for ergonomic configuration:
///
/// ```
/// use vaultenv::Config;
/// use std::time::Duration;
///
/// let config = Config::new("https://vault.example.com:8200", "role-id", "secret-id")
///     .with_timeout(Duration::from_secs(2))
///     .with_role_prefix("mesos")
///     .with_default_secrets_path("secrets_v1/mesos")
///     .with_app_name_label("app");
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Store address, e.g. `https://vault.example.com:8200`
    #[serde(rename = "vault_url")]
    pub url: String,

    /// Per-request timeout (JSON: whole seconds)
    #[serde(
        rename = "vault_timeout",
        default = "default_timeout",
        deserialize_with = "deserialize_secs"
    )]
    pub timeout: Duration,

    /// Root AppRole credentials
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Prefix applied once to every derived role name
    #[serde(default = "default_role_prefix")]
    pub role_prefix: String,

    /// Root of the per-workload secret hierarchy
    #[serde(default = "default_secrets_path")]
    pub default_secrets_path: String,

    /// Label whose value overrides the workload identifier
    #[serde(default)]
    pub app_name_label: Option<String>,

    /// TLS material
    #[serde(default, rename = "ssl")]
    pub tls: Option<TlsConfig>,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_role_prefix() -> String {
    DEFAULT_ROLE_PREFIX.to_string()
}

fn default_secrets_path() -> String {
    DEFAULT_SECRETS_PATH.to_string()
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl Config {
    /// Creates a configuration with default timeout, prefix and secrets path.
    pub fn new(
        url: impl Into<String>,
        role_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            credentials: Credentials::new(role_id, secret_id),
            role_prefix: default_role_prefix(),
            default_secrets_path: default_secrets_path(),
            app_name_label: None,
            tls: None,
        }
    }

    /// Parses a JSON configuration document.
    ///
    /// # Example
    ///
    /// ```
    /// use vaultenv::Config;
    ///
    /// let config = Config::from_json(r#"{
    ///     "vault_url": "http://127.0.0.1:8200",
    ///     "vault_timeout": 1,
    ///     "role_id": "plugin-role-id",
    ///     "secret_id": "plugin-secret-id",
    ///     "default_secrets_path": "/secrets_v1/mesos"
    /// }"#).unwrap();
    ///
    /// assert_eq!(config.role_prefix, "mesos");
    /// assert_eq!(config.timeout.as_secs(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = tokio::fs::read_to_string(path).await?;
        Self::from_json(&data)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the role name prefix.
    pub fn with_role_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.role_prefix = prefix.into();
        self
    }

    /// Sets the root of the default secret hierarchy.
    pub fn with_default_secrets_path(mut self, path: impl Into<String>) -> Self {
        self.default_secrets_path = path.into();
        self
    }

    /// Derives workload identity from this label when present.
    pub fn with_app_name_label(mut self, label: impl Into<String>) -> Self {
        self.app_name_label = Some(label.into());
        self
    }

    /// Sets TLS material.
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Checks that the configuration can be used to build an engine.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(VaultenvError::InvalidConfig("vault_url is empty".to_string()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(VaultenvError::InvalidConfig(format!(
                "vault_url must be http:// or https://: {}",
                self.url
            )));
        }
        if self.timeout.is_zero() {
            return Err(VaultenvError::InvalidConfig(
                "vault_timeout must be positive".to_string(),
            ));
        }
        if self.credentials.role_id.is_empty() {
            return Err(VaultenvError::InvalidConfig("role_id is empty".to_string()));
        }
        if self.credentials.secret_id.is_empty() {
            return Err(VaultenvError::InvalidConfig("secret_id is empty".to_string()));
        }
        if let Some(tls) = &self.tls {
            if tls.client_pem_file.is_some() != tls.client_key_pem_file.is_some() {
                return Err(VaultenvError::InvalidConfig(
                    "client_pem_file and client_key_pem_file must be set together".to_string(),
                ));
            }
        }
        Ok(())
    }
}
