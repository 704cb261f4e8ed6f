//! Session management for authenticated store access.
//!
//! This module provides the immutable [`Session`] handle produced by an
//! AppRole login, and the [`SessionManager`] that owns the engine's single
//! root session and refreshes it when its lease runs low.

use crate::config::Credentials;
use crate::store::StoreClient;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A session is stale once its lease has less than this many seconds left.
pub const VALIDITY_THRESHOLD_SECS: i64 = 60;

/// An authenticated handle on the store.
///
/// Sessions never change after login; [`Session::refresh`] produces a new
/// one. Cloning is cheap and shares the underlying client.
#[derive(Clone)]
pub struct Session {
    client: Arc<dyn StoreClient>,
    token: String,
    credentials: Credentials,
    lease_expiry: DateTime<Utc>,
}

impl Session {
    /// Logs in with `credentials` and starts the lease at `now`.
    ///
    /// A lease duration of zero means the store attached no expiry; such
    /// sessions are treated as never expiring.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::Auth`](crate::VaultenvError::Auth) if the
    /// store rejects the credentials.
    pub async fn login(
        client: Arc<dyn StoreClient>,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let lease = client
            .login(&credentials.role_id, &credentials.secret_id)
            .await?;

        let lease_expiry = if lease.lease_duration > 0 {
            i64::try_from(lease.lease_duration)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        } else {
            DateTime::<Utc>::MAX_UTC
        };

        tracing::debug!(
            client = client.name(),
            lease_seconds = lease.lease_duration,
            "approle login succeeded"
        );

        Ok(Self {
            client,
            token: lease.client_token,
            credentials,
            lease_expiry,
        })
    }

    /// Returns the client token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the credentials this session was obtained with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns when the lease ends.
    pub fn lease_expiry(&self) -> DateTime<Utc> {
        self.lease_expiry
    }

    /// Returns the store client this session talks through.
    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    /// True while `now` is more than [`VALIDITY_THRESHOLD_SECS`] before expiry.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.lease_expiry - Duration::seconds(VALIDITY_THRESHOLD_SECS) > now
    }

    /// Returns this session if fresh, otherwise logs in again with the same
    /// credentials.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<Self> {
        if self.is_fresh(now) {
            return Ok(self.clone());
        }
        tracing::debug!(expired_at = %self.lease_expiry, "session stale, logging in again");
        Self::login(Arc::clone(&self.client), self.credentials.clone(), now).await
    }

    // ========================================================================
    // Store operations on behalf of this session
    // ========================================================================

    /// Reads the secrets stored at `path`.
    pub async fn read_secrets(&self, path: &str) -> Result<HashMap<String, String>> {
        self.client.read_secrets(&self.token, path).await
    }

    /// Lists entries below `path`; a missing path lists as empty.
    pub async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        self.client.list_children(&self.token, path).await
    }

    /// Checks whether an AppRole exists.
    pub async fn role_exists(&self, role: &str) -> Result<bool> {
        self.client.role_exists(&self.token, role).await
    }

    /// Looks up an AppRole's role-id.
    pub async fn issue_role_id(&self, role: &str) -> Result<String> {
        self.client.issue_role_id(&self.token, role).await
    }

    /// Issues a fresh secret-id for an AppRole.
    pub async fn issue_secret_id(&self, role: &str) -> Result<String> {
        self.client.issue_secret_id(&self.token, role).await
    }

    /// Invalidates an issued secret-id.
    pub async fn destroy_secret_id(&self, role: &str, secret_id: &str) -> Result<()> {
        self.client
            .destroy_secret_id(&self.token, role, secret_id)
            .await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client.name())
            .field("lease_expiry", &self.lease_expiry)
            .finish_non_exhaustive()
    }
}

/// Owns the engine's root session.
///
/// Check-and-refresh runs under one lock, so concurrent callers that find
/// the session stale wait for a single login instead of each logging in.
pub struct SessionManager {
    client: Arc<dyn StoreClient>,
    credentials: Credentials,
    current: Mutex<Option<Arc<Session>>>,
}

impl SessionManager {
    /// Creates a manager; no login happens until the first [`current`](Self::current).
    pub fn new(client: Arc<dyn StoreClient>, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            current: Mutex::new(None),
        }
    }

    /// Returns a fresh root session, logging in if there is none or it is stale.
    pub async fn current(&self) -> Result<Arc<Session>> {
        self.current_at(Utc::now()).await
    }

    /// Same as [`current`](Self::current) with an explicit clock reading.
    pub async fn current_at(&self, now: DateTime<Utc>) -> Result<Arc<Session>> {
        let mut slot = self.current.lock().await;

        if let Some(session) = slot.as_ref() {
            if session.is_fresh(now) {
                return Ok(Arc::clone(session));
            }
        }

        let session = match slot.as_ref() {
            Some(stale) => stale.refresh(now).await?,
            None => {
                Session::login(Arc::clone(&self.client), self.credentials.clone(), now).await?
            }
        };
        let session = Arc::new(session);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }
}
