//! AppRole discovery for workloads.
//!
//! A workload identifier such as `/team/app/task` maps to candidate role
//! names from most to least specific (`mesos-team-app-task`,
//! `mesos-team-app`, `mesos-team`). The first one the store knows wins.
//! Finding none is a normal outcome: the workload has no secrets.

use crate::path::{join, role_candidates};
use crate::session::Session;
use crate::Result;
use std::collections::HashMap;
use std::future::Future;

/// A store-recognized role together with the namespace it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRole {
    /// Full role name, prefix included
    pub name: String,
    /// Workload segments the name was built from
    pub namespace: Vec<String>,
}

impl AppRole {
    /// The namespace as a slash-joined path.
    pub fn namespace_path(&self) -> String {
        join(&self.namespace)
    }
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Derives the role for a workload.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    prefix: String,
    app_name_label: Option<String>,
}

impl RoleResolver {
    /// Creates a resolver applying `prefix` to every role name.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            app_name_label: None,
        }
    }

    /// Uses the value of this label, when present, as the workload identity.
    pub fn with_app_name_label(mut self, label: Option<String>) -> Self {
        self.app_name_label = label;
        self
    }

    /// The identity used for role derivation: the override label's value if
    /// configured and present, the raw workload identifier otherwise.
    pub fn workload_identity<'a>(
        &self,
        workload_id: &'a str,
        labels: &'a HashMap<String, String>,
    ) -> &'a str {
        self.app_name_label
            .as_ref()
            .and_then(|label| labels.get(label))
            .map(String::as_str)
            .unwrap_or(workload_id)
    }

    /// Candidate roles for an identity, most specific first.
    pub fn candidates(&self, identity: &str) -> Vec<AppRole> {
        role_candidates(&self.prefix, identity)
            .into_iter()
            .map(|(name, namespace)| AppRole {
                name,
                namespace: namespace.into_iter().map(str::to_string).collect(),
            })
            .collect()
    }

    /// Finds the most specific existing role for a workload, checking with
    /// the root `session`.
    ///
    /// Returns `Ok(None)` when no candidate exists.
    ///
    /// # Errors
    ///
    /// Store failures other than not-found propagate.
    pub async fn role_for(
        &self,
        session: &Session,
        workload_id: &str,
        labels: &HashMap<String, String>,
    ) -> Result<Option<AppRole>> {
        let identity = self.workload_identity(workload_id, labels);
        first_existing(self.candidates(identity), |role| async move {
            session.role_exists(&role).await
        })
        .await
    }
}

/// Returns the first candidate for which `exists` holds, checking in order
/// and stopping at the first hit.
pub async fn first_existing<F, Fut>(
    candidates: Vec<AppRole>,
    exists: F,
) -> Result<Option<AppRole>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for candidate in candidates {
        if exists(candidate.name.clone()).await? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::stores::mock::MockStore;
    use crate::VaultenvError;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    fn names(roles: &[AppRole]) -> Vec<&str> {
        roles.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_candidates() {
        let resolver = RoleResolver::new("mesos");
        let candidates = resolver.candidates("/team/app/task");
        assert_eq!(
            names(&candidates),
            ["mesos-team-app-task", "mesos-team-app", "mesos-team"]
        );
        assert_eq!(candidates[1].namespace_path(), "team/app");
    }

    #[test]
    fn test_label_override() {
        let resolver = RoleResolver::new("mesos").with_app_name_label(Some("app".to_string()));
        let labels = HashMap::from([("app".to_string(), "/ns/test-app".to_string())]);
        assert_eq!(resolver.workload_identity("/ns/test-app/task", &labels), "/ns/test-app");
        assert_eq!(
            resolver.workload_identity("/ns/test-app/task", &HashMap::new()),
            "/ns/test-app/task"
        );

        let unlabeled = RoleResolver::new("mesos");
        assert_eq!(unlabeled.workload_identity("/a", &labels), "/a");
    }

    #[tokio::test]
    async fn test_first_existing_stops_at_first_hit() {
        let resolver = RoleResolver::new("mesos");
        let checked = Mutex::new(Vec::new());

        let found = first_existing(resolver.candidates("a/b/c/d"), |name| {
            checked.lock().unwrap().push(name.clone());
            async move { Ok::<_, VaultenvError>(name == "mesos-a-b") }
        })
        .await
        .unwrap();

        assert_eq!(found.unwrap().namespace, vec!["a", "b"]);
        assert_eq!(
            *checked.lock().unwrap(),
            vec!["mesos-a-b-c-d", "mesos-a-b-c", "mesos-a-b"]
        );
    }

    #[tokio::test]
    async fn test_first_existing_none() {
        let resolver = RoleResolver::new("mesos");
        let found = first_existing(resolver.candidates("a/b"), |_| async {
            Ok::<_, VaultenvError>(false)
        })
        .await
        .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_role_for_against_store() {
        let store = Arc::new(MockStore::new("rid", "sid"));
        store.set_role("mesos-team-app").await;
        let session = Session::login(store.clone(), Credentials::new("rid", "sid"), Utc::now())
            .await
            .unwrap();

        let role = RoleResolver::new("mesos")
            .role_for(&session, "/team/app/task", &HashMap::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(role.name, "mesos-team-app");
        assert_eq!(
            store.role_checks().await,
            vec!["mesos-team-app-task", "mesos-team-app"]
        );

        let none = RoleResolver::new("mesos")
            .role_for(&session, "/other", &HashMap::new())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_role_for_propagates_store_errors() {
        let mut store = MockStore::new("rid", "sid");
        store.role_error = Some(500);
        let store = Arc::new(store);
        let session = Session::login(store, Credentials::new("rid", "sid"), Utc::now())
            .await
            .unwrap();

        let err = RoleResolver::new("mesos")
            .role_for(&session, "/team/app", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VaultenvError::Store { code: 500, .. }));
    }
}
