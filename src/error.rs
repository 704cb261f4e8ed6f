//! Error types for vaultenv operations.

use thiserror::Error;

/// Result type alias using [`VaultenvError`].
pub type Result<T> = std::result::Result<T, VaultenvError>;

/// Errors that can occur while authenticating to the store or resolving secrets.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum VaultenvError {
    /// Root or delegated AppRole login was rejected.
    #[error("approle login failed with status {code}: {message}")]
    Auth {
        /// HTTP status returned by the login endpoint
        code: u16,
        /// Response body, if any
        message: String,
    },

    /// The store answered with a non-success status.
    #[error("store responded with status {code} for {path}: {message}")]
    Store {
        /// HTTP status
        code: u16,
        /// Normalized store path the request was made against
        path: String,
        /// Response body, if any
        message: String,
    },

    /// No role exists for any prefix of the workload identifier.
    #[error("no approle found for workload: {0}")]
    NoRole(String),

    /// The request never produced a response (connect failure, timeout, TLS).
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error occurred (configuration or TLS material loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is missing a required value or holds an unusable one.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom secret selector is not of the form `<path>@<key>`.
    #[error("invalid custom secret selector: {0}")]
    InvalidSelector(String),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VaultenvError {
    /// Creates a [`VaultenvError::Store`] for a failed request.
    pub fn store(code: u16, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            code,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true for failures talking to the store: bad statuses and
    /// transport errors alike.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Http(_))
    }

    /// Returns true if the workload simply has no role configured.
    pub fn is_no_role(&self) -> bool {
        matches!(self, Self::NoRole(_))
    }

    /// Returns true if a login was rejected.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth { code, .. } | Self::Store { code, .. } => Some(*code),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
