//! Resolved secret data structures.

use crate::role::AppRole;
use serde::Serialize;
use std::collections::BTreeMap;

/// Secrets resolved for one workload.
///
/// Default and custom secrets are kept apart to report where each value
/// came from; [`all_secrets`](Self::all_secrets) merges them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSecrets {
    /// Secrets found under the workload's default path, keyed by env name
    pub default_secrets: BTreeMap<String, String>,

    /// Explicitly requested secrets, keyed by requested name
    pub custom_secrets: BTreeMap<String, String>,

    /// Role the secrets were read with
    #[serde(serialize_with = "serialize_role")]
    pub role: AppRole,
}

fn serialize_role<S: serde::Serializer>(role: &AppRole, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&role.name)
}

impl ResolvedSecrets {
    /// Merges default and custom secrets; custom entries win on collision.
    ///
    /// # Example
    ///
    /// ```
    /// use vaultenv::{AppRole, ResolvedSecrets};
    /// use std::collections::BTreeMap;
    ///
    /// let resolved = ResolvedSecrets {
    ///     default_secrets: BTreeMap::from([("A".to_string(), "1".to_string())]),
    ///     custom_secrets: BTreeMap::from([("A".to_string(), "2".to_string())]),
    ///     role: AppRole { name: "mesos-app".to_string(), namespace: vec!["app".to_string()] },
    /// };
    ///
    /// assert_eq!(resolved.all_secrets()["A"], "2");
    /// ```
    pub fn all_secrets(&self) -> BTreeMap<String, String> {
        let mut merged = self.default_secrets.clone();
        merged.extend(
            self.custom_secrets
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Names of every resolved variable, sorted, without values.
    pub fn all_names(&self) -> Vec<String> {
        self.all_secrets().into_keys().collect()
    }

    /// True if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.default_secrets.is_empty() && self.custom_secrets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved() -> ResolvedSecrets {
        ResolvedSecrets {
            default_secrets: BTreeMap::from([
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "default".to_string()),
            ]),
            custom_secrets: BTreeMap::from([("A".to_string(), "2".to_string())]),
            role: AppRole {
                name: "mesos-app".to_string(),
                namespace: vec!["app".to_string()],
            },
        }
    }

    #[test]
    fn test_custom_overrides_default() {
        let merged = resolved().all_secrets();
        assert_eq!(merged["A"], "2");
        assert_eq!(merged["B"], "default");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_all_names() {
        assert_eq!(resolved().all_names(), vec!["A", "B"]);
        assert!(!resolved().is_empty());
    }

    #[test]
    fn test_serialize_reports_role_name() {
        let json = serde_json::to_value(resolved()).unwrap();
        assert_eq!(json["role"], "mesos-app");
        assert_eq!(json["custom_secrets"]["A"], "2");
    }
}
