//! Secret aggregation for a workload.
//!
//! [`SecretAggregator::resolve`] is the engine's entry point: it finds the
//! workload's role with the root session, elevates to that role, and inside
//! the one delegated session gathers
//!
//! - default secrets: every secret directly below
//!   `<default_secrets_path>/<role namespace>`, exposed as
//!   `<ENTRY>_<KEY>` variables
//! - custom secrets: explicit `<path>@<key>` selectors, exposed under the
//!   requested name
//!
//! Custom secrets override default ones with the same name.

use crate::config::Config;
use crate::path::{env_name, is_directory, join, Selector};
use crate::role::{AppRole, RoleResolver};
use crate::secrets::ResolvedSecrets;
use crate::session::{Session, SessionManager};
use crate::store::StoreClient;
use crate::stores::http::HttpStore;
use crate::{Result, VaultenvError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Resolves workload environments from the store.
///
/// One aggregator serves any number of concurrent `resolve` calls; they share
/// the root session and each gets its own delegated session.
///
/// # Example
///
/// ```no_run
/// use vaultenv::{Config, SecretAggregator};
/// use std::collections::HashMap;
///
/// #[tokio::main]
/// async fn main() -> vaultenv::Result<()> {
///     let config = Config::new("https://vault.example.com:8200", "role-id", "secret-id")
///         .with_default_secrets_path("secrets_v1/mesos");
///     let aggregator = SecretAggregator::new(config)?;
///
///     let custom = HashMap::from([(
///         "DB_PASSWORD".to_string(),
///         "secrets_v1/shared/db@password".to_string(),
///     )]);
///
///     match aggregator.resolve("/team/app/task", &custom, &HashMap::new()).await {
///         Ok(resolved) => println!("{:?}", resolved.all_names()),
///         Err(e) if e.is_no_role() => println!("no secrets configured"),
///         Err(e) => return Err(e),
///     }
///     Ok(())
/// }
/// ```
pub struct SecretAggregator {
    sessions: SessionManager,
    roles: RoleResolver,
    default_secrets_path: String,
}

impl SecretAggregator {
    /// Creates an aggregator talking to Vault over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::InvalidConfig`] for an unusable configuration
    /// and I/O or TLS errors for unreadable TLS material.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let store = HttpStore::new(&config)?;
        Ok(Self::with_store(&config, Arc::new(store)))
    }

    /// Creates an aggregator over any store client.
    pub fn with_store(config: &Config, store: Arc<dyn StoreClient>) -> Self {
        Self {
            sessions: SessionManager::new(store, config.credentials.clone()),
            roles: RoleResolver::new(config.role_prefix.clone())
                .with_app_name_label(config.app_name_label.clone()),
            default_secrets_path: config.default_secrets_path.clone(),
        }
    }

    /// Path holding a role's default secrets.
    pub fn base_path(&self, role: &AppRole) -> String {
        join([self.default_secrets_path.as_str(), &role.namespace_path()])
    }

    /// Resolves every secret for a workload.
    ///
    /// `custom_selectors` maps requested names to `<path>@<key>` selectors.
    /// `labels` may carry the workload-identity override label.
    ///
    /// # Errors
    ///
    /// - [`VaultenvError::NoRole`]: no role exists for the workload
    /// - [`VaultenvError::Auth`]: root or delegated login failed
    /// - [`VaultenvError::Store`] / [`VaultenvError::Http`]: a store call
    ///   other than a custom-secret read failed
    pub async fn resolve(
        &self,
        workload_id: &str,
        custom_selectors: &HashMap<String, String>,
        labels: &HashMap<String, String>,
    ) -> Result<ResolvedSecrets> {
        let root = self.sessions.current().await?;

        let role = self
            .roles
            .role_for(&root, workload_id, labels)
            .await?
            .ok_or_else(|| VaultenvError::NoRole(workload_id.to_string()))?;
        let base_path = self.base_path(&role);

        let (default_secrets, custom_secrets) = root
            .elevate(&role.name, |scoped| async move {
                let defaults = resolve_defaults(&scoped, &base_path).await?;
                let custom = resolve_custom(&scoped, custom_selectors).await;
                Ok::<_, VaultenvError>((defaults, custom))
            })
            .await?;

        let resolved = ResolvedSecrets {
            default_secrets,
            custom_secrets,
            role,
        };

        tracing::info!(
            workload = workload_id,
            role = %resolved.role,
            base_path = %self.base_path(&resolved.role),
            names = ?resolved.all_names(),
            "resolved workload secrets"
        );

        Ok(resolved)
    }
}

/// Reads every secret directly below `base_path` into env-style names.
///
/// Namespaces (entries ending in `/`) are skipped. A missing `base_path`
/// yields an empty map. On name collisions the later entry wins.
pub async fn resolve_defaults(session: &Session, base_path: &str) -> Result<BTreeMap<String, String>> {
    let mut envs = BTreeMap::new();

    for entry in session.list_children(base_path).await? {
        if is_directory(&entry) {
            continue;
        }

        let secrets: BTreeMap<_, _> = session
            .read_secrets(&join([base_path, entry.as_str()]))
            .await?
            .into_iter()
            .collect();

        for (key, value) in secrets {
            envs.insert(env_name(&entry, &key), value);
        }
    }

    Ok(envs)
}

/// Resolves explicitly requested secrets.
///
/// Never fails: a malformed selector, an unreadable path or a missing key
/// resolves to an empty string and is logged.
pub async fn resolve_custom(
    session: &Session,
    selectors: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    let mut envs = BTreeMap::new();

    for (name, selector) in selectors {
        let value = match Selector::parse(selector) {
            Ok(selector) => read_custom(session, name, &selector).await,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "ignoring custom secret");
                String::new()
            }
        };
        envs.insert(name.clone(), value);
    }

    envs
}

async fn read_custom(session: &Session, name: &str, selector: &Selector<'_>) -> String {
    let secrets = match session.read_secrets(selector.path).await {
        Ok(secrets) => secrets,
        Err(e) => {
            tracing::warn!(
                name,
                path = selector.path,
                error = %e,
                "custom secret unreadable, using blank value"
            );
            HashMap::new()
        }
    };

    secrets.get(selector.key).cloned().unwrap_or_else(|| {
        tracing::debug!(name, key = selector.key, "custom secret key missing");
        String::new()
    })
}
