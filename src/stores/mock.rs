//! Mock store for testing.
//!
//! This store keeps roles, secrets and issued credentials in memory and
//! records every credential it hands out, so tests can assert on the
//! delegation lifecycle without a running Vault.

use crate::path::normalize;
use crate::store::{AuthLease, StoreClient};
use crate::{Result, VaultenvError};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Mock store for testing.
///
/// Error injection fields hold the HTTP status the matching operation should
/// fail with.
///
/// # Example
///
/// ```
/// use vaultenv::stores::mock::MockStore;
/// use vaultenv::store::StoreClient;
///
/// #[tokio::main]
/// async fn main() -> vaultenv::Result<()> {
///     let store = MockStore::new("root-role-id", "root-secret-id");
///     store.set_role("mesos-team-app").await;
///     store.set_secret("secrets/team/app/passwords", [("db", "hunter2")]).await;
///
///     let lease = store.login("root-role-id", "root-secret-id").await?;
///     let keys = store.list_children(&lease.client_token, "secrets/team/app").await?;
///     assert_eq!(keys, vec!["passwords".to_string()]);
///
///     Ok(())
/// }
/// ```
pub struct MockStore {
    /// role name -> role-id
    roles: RwLock<HashMap<String, String>>,
    /// role-id -> valid secret-ids
    secret_ids: RwLock<HashMap<String, BTreeSet<String>>>,
    secrets: RwLock<HashMap<String, HashMap<String, String>>>,
    tokens: RwLock<BTreeSet<String>>,

    issued: RwLock<Vec<(String, String)>>,
    destroyed: RwLock<Vec<(String, String)>>,
    role_checks: RwLock<Vec<String>>,
    logins: AtomicUsize,

    /// Lease duration handed out on login, in seconds
    pub lease_duration: u64,
    /// Delay applied to every login
    pub login_delay: Option<Duration>,
    /// Status to fail `login()` with
    pub auth_error: Option<u16>,
    /// Status to fail `read_secrets()` with
    pub read_error: Option<u16>,
    /// Status to fail `list_children()` with
    pub list_error: Option<u16>,
    /// Status to fail `role_exists()` with
    pub role_error: Option<u16>,
    /// Status to fail `issue_secret_id()` with
    pub issue_error: Option<u16>,
    /// Status to fail `destroy_secret_id()` with
    pub destroy_error: Option<u16>,
}

const ROOT_ROLE: &str = "__root__";

impl MockStore {
    /// Creates a store that accepts the given root credentials.
    pub fn new(root_role_id: impl Into<String>, root_secret_id: impl Into<String>) -> Self {
        let root_role_id = root_role_id.into();
        let mut roles = HashMap::new();
        roles.insert(ROOT_ROLE.to_string(), root_role_id.clone());
        let mut secret_ids = HashMap::new();
        secret_ids.insert(root_role_id, BTreeSet::from([root_secret_id.into()]));

        Self {
            roles: RwLock::new(roles),
            secret_ids: RwLock::new(secret_ids),
            secrets: RwLock::new(HashMap::new()),
            tokens: RwLock::new(BTreeSet::new()),
            issued: RwLock::new(Vec::new()),
            destroyed: RwLock::new(Vec::new()),
            role_checks: RwLock::new(Vec::new()),
            logins: AtomicUsize::new(0),
            lease_duration: 3600,
            login_delay: None,
            auth_error: None,
            read_error: None,
            list_error: None,
            role_error: None,
            issue_error: None,
            destroy_error: None,
        }
    }

    /// Pre-populates an AppRole.
    pub async fn set_role(&self, name: impl Into<String>) {
        let name = name.into();
        let role_id = format!("{}-role-id", name);
        self.roles.write().await.insert(name, role_id);
    }

    /// Pre-populates a secret at `path`.
    pub async fn set_secret<I, K, V>(&self, path: &str, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.secrets
            .write()
            .await
            .insert(normalize(path).to_string(), values);
    }

    /// Secret-ids issued so far, as `(role, secret_id)`.
    pub async fn issued_secret_ids(&self) -> Vec<(String, String)> {
        self.issued.read().await.clone()
    }

    /// Secret-ids destroyed so far, as `(role, secret_id)`.
    pub async fn destroyed_secret_ids(&self) -> Vec<(String, String)> {
        self.destroyed.read().await.clone()
    }

    /// Role names passed to `role_exists()`, in call order.
    pub async fn role_checks(&self) -> Vec<String> {
        self.role_checks.read().await.clone()
    }

    /// Number of successful logins.
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    async fn authorize(&self, token: &str, path: &str) -> Result<()> {
        if self.tokens.read().await.contains(token) {
            Ok(())
        } else {
            Err(VaultenvError::store(403, normalize(path), "permission denied"))
        }
    }

    async fn role_id_of(&self, role: &str) -> Result<String> {
        self.roles
            .read()
            .await
            .get(role)
            .cloned()
            .ok_or_else(|| VaultenvError::store(404, format!("auth/approle/role/{}", role), ""))
    }
}

fn injected(code: Option<u16>, path: &str) -> Result<()> {
    match code {
        Some(code) => Err(VaultenvError::store(code, normalize(path), "injected failure")),
        None => Ok(()),
    }
}

#[async_trait]
impl StoreClient for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self, role_id: &str, secret_id: &str) -> Result<AuthLease> {
        if let Some(delay) = self.login_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = self.auth_error {
            return Err(VaultenvError::Auth {
                code,
                message: "injected failure".to_string(),
            });
        }

        let valid = self
            .secret_ids
            .read()
            .await
            .get(role_id)
            .is_some_and(|ids| ids.contains(secret_id));
        if !valid {
            return Err(VaultenvError::Auth {
                code: 400,
                message: "invalid role or secret ID".to_string(),
            });
        }

        let token = format!("s.{}", uuid::Uuid::new_v4());
        self.tokens.write().await.insert(token.clone());
        self.logins.fetch_add(1, Ordering::SeqCst);

        Ok(AuthLease {
            client_token: token,
            lease_duration: self.lease_duration,
        })
    }

    async fn read_secrets(&self, token: &str, path: &str) -> Result<HashMap<String, String>> {
        self.authorize(token, path).await?;
        injected(self.read_error, path)?;

        self.secrets
            .read()
            .await
            .get(normalize(path))
            .cloned()
            .ok_or_else(|| VaultenvError::store(404, normalize(path), ""))
    }

    async fn list_children(&self, token: &str, path: &str) -> Result<Vec<String>> {
        self.authorize(token, path).await?;
        injected(self.list_error, path)?;

        let prefix = format!("{}/", normalize(path));
        let children: BTreeSet<String> = self
            .secrets
            .read()
            .await
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| match rest.split_once('/') {
                Some((dir, _)) => format!("{}/", dir),
                None => rest.to_string(),
            })
            .collect();

        Ok(children.into_iter().collect())
    }

    async fn role_exists(&self, token: &str, role: &str) -> Result<bool> {
        let path = format!("auth/approle/role/{}", role);
        self.authorize(token, &path).await?;
        self.role_checks.write().await.push(role.to_string());
        injected(self.role_error, &path)?;

        Ok(self.roles.read().await.contains_key(role))
    }

    async fn issue_role_id(&self, token: &str, role: &str) -> Result<String> {
        self.authorize(token, "auth/approle/role").await?;
        self.role_id_of(role).await
    }

    async fn issue_secret_id(&self, token: &str, role: &str) -> Result<String> {
        let path = format!("auth/approle/role/{}/secret-id", role);
        self.authorize(token, &path).await?;
        injected(self.issue_error, &path)?;

        let role_id = self.role_id_of(role).await?;
        let secret_id = uuid::Uuid::new_v4().to_string();
        self.secret_ids
            .write()
            .await
            .entry(role_id)
            .or_default()
            .insert(secret_id.clone());
        self.issued
            .write()
            .await
            .push((role.to_string(), secret_id.clone()));

        Ok(secret_id)
    }

    async fn destroy_secret_id(&self, token: &str, role: &str, secret_id: &str) -> Result<()> {
        let path = format!("auth/approle/role/{}/secret-id/destroy", role);
        self.authorize(token, &path).await?;
        self.destroyed
            .write()
            .await
            .push((role.to_string(), secret_id.to_string()));
        injected(self.destroy_error, &path)?;

        let role_id = self.role_id_of(role).await?;
        if let Some(ids) = self.secret_ids.write().await.get_mut(&role_id) {
            ids.remove(secret_id);
        }
        Ok(())
    }
}
