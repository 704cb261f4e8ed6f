//! Store client trait definition.
//!
//! This module defines the [`StoreClient`] trait: the wire-level operations the
//! engine needs from the secret store. Every call other than `login` carries
//! the token of the session it is made on behalf of.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Token and lease returned by a successful AppRole login.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthLease {
    /// Client token to send with subsequent requests
    pub client_token: String,
    /// Lease duration in seconds; zero means the store set no expiry
    pub lease_duration: u64,
}

impl std::fmt::Debug for AuthLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthLease")
            .field("client_token", &"<redacted>")
            .field("lease_duration", &self.lease_duration)
            .finish()
    }
}

/// StoreClient represents the secret store as seen by the engine.
///
/// All implementations must be `Send + Sync` so one client can back the root
/// session and every delegated session concurrently.
///
/// # Implementations
///
/// - [`HttpStore`](crate::stores::http::HttpStore): HashiCorp Vault over HTTP
/// - [`MockStore`](crate::stores::mock::MockStore): in-memory, with error injection
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Returns the client name (e.g., "http", "mock").
    fn name(&self) -> &str;

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Logs in with an AppRole role-id/secret-id pair.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::Auth`](crate::VaultenvError::Auth) on any
    /// non-success response.
    async fn login(&self, role_id: &str, secret_id: &str) -> Result<AuthLease>;

    // ========================================================================
    // Secrets
    // ========================================================================

    /// Reads the key/value pairs stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::Store`](crate::VaultenvError::Store) on any
    /// non-success status, including not-found.
    async fn read_secrets(&self, token: &str, path: &str) -> Result<HashMap<String, String>>;

    /// Lists the entries directly below `path`.
    ///
    /// Entries ending in `/` are namespaces. A path that does not exist
    /// yields an empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::Store`](crate::VaultenvError::Store) on any
    /// non-success status other than not-found.
    async fn list_children(&self, token: &str, path: &str) -> Result<Vec<String>>;

    // ========================================================================
    // AppRole administration
    // ========================================================================

    /// Checks whether an AppRole with this name exists.
    async fn role_exists(&self, token: &str, role: &str) -> Result<bool>;

    /// Looks up the role-id of an AppRole.
    async fn issue_role_id(&self, token: &str, role: &str) -> Result<String>;

    /// Issues a fresh secret-id for an AppRole.
    async fn issue_secret_id(&self, token: &str, role: &str) -> Result<String>;

    /// Invalidates a previously issued secret-id.
    async fn destroy_secret_id(&self, token: &str, role: &str, secret_id: &str) -> Result<()>;
}
