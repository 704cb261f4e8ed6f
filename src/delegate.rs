//! Delegated sessions.
//!
//! The root session only mints credentials. Work happens on a session
//! logged in as the workload's own role with a single-use secret-id, and
//! that secret-id is destroyed once the work is over, whether it succeeded,
//! failed, panicked or was cancelled.

use crate::config::Credentials;
use crate::session::Session;
use crate::Result;
use chrono::Utc;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Runs `operation` on a session scoped to `role`.
///
/// 1. looks up the role-id of `role` and issues a secret-id with `root`
/// 2. logs in with that pair
/// 3. runs `operation` on the new session
/// 4. destroys the secret-id, then returns the operation's outcome
///
/// A failed destroy is logged and does not change the returned result.
///
/// # Errors
///
/// Issuance failures and the delegated login's
/// [`VaultenvError::Auth`](crate::VaultenvError::Auth) propagate, as does
/// whatever `operation` returns.
pub async fn elevate<T, F, Fut>(root: &Session, role: &str, operation: F) -> Result<T>
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let role_id = root.issue_role_id(role).await?;
    let secret_id = root.issue_secret_id(role).await?;
    let mut guard = SecretIdGuard::new(root.clone(), role, secret_id.clone());

    let outcome = AssertUnwindSafe(async {
        let scoped = Session::login(
            Arc::clone(root.client()),
            Credentials::new(role_id, secret_id),
            Utc::now(),
        )
        .await?;
        tracing::debug!(role, "delegated session established");
        operation(scoped).await
    })
    .catch_unwind()
    .await;

    guard.release().await;

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

impl Session {
    /// Runs `operation` on a session scoped to `role`. See [`elevate`].
    pub async fn elevate<T, F, Fut>(&self, role: &str, operation: F) -> Result<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        elevate(self, role, operation).await
    }
}

/// Destroys an issued secret-id exactly once.
///
/// `release` destroys inline. If the guard is dropped unreleased (the
/// elevating future was cancelled) the destroy is spawned on the current
/// runtime instead.
struct SecretIdGuard {
    root: Session,
    role: String,
    secret_id: Option<String>,
}

impl SecretIdGuard {
    fn new(root: Session, role: &str, secret_id: String) -> Self {
        Self {
            root,
            role: role.to_string(),
            secret_id: Some(secret_id),
        }
    }

    async fn release(&mut self) {
        if let Some(secret_id) = self.secret_id.take() {
            destroy(&self.root, &self.role, &secret_id).await;
        }
    }
}

impl Drop for SecretIdGuard {
    fn drop(&mut self) {
        let Some(secret_id) = self.secret_id.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let root = self.root.clone();
                let role = std::mem::take(&mut self.role);
                handle.spawn(async move { destroy(&root, &role, &secret_id).await });
            }
            Err(_) => {
                tracing::warn!(
                    role = %self.role,
                    "no runtime to destroy delegated secret-id; it stays valid until its TTL"
                );
            }
        }
    }
}

async fn destroy(root: &Session, role: &str, secret_id: &str) {
    match root.destroy_secret_id(role, secret_id).await {
        Ok(()) => tracing::debug!(role, "delegated secret-id destroyed"),
        Err(e) => tracing::warn!(role, error = %e, "failed to destroy delegated secret-id"),
    }
}
