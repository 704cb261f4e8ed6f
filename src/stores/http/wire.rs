//! JSON shapes of Vault replies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope around every `data`-carrying reply.
#[derive(Debug, Deserialize)]
pub(crate) struct Reply<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListData {
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginReply {
    pub auth: AuthData,
}

#[derive(Deserialize)]
pub(crate) struct AuthData {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
}

impl std::fmt::Debug for AuthData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthData")
            .field("lease_duration", &self.lease_duration)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoleIdData {
    pub role_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SecretIdData {
    pub secret_id: String,
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub role_id: &'a str,
    pub secret_id: &'a str,
}

#[derive(Serialize)]
pub(crate) struct DestroyRequest<'a> {
    pub secret_id: &'a str,
}

/// Flattens a secret's `data` object into strings.
///
/// Scalars are rendered with their JSON text; nulls, arrays and objects have
/// no environment representation and are dropped.
pub(crate) fn flatten_values(data: HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    data.into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            serde_json::Value::Number(n) => Some((key, n.to_string())),
            serde_json::Value::Bool(b) => Some((key, b.to_string())),
            _ => {
                tracing::debug!(key = %key, "skipping non-scalar secret value");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_values() {
        let data: HashMap<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
            "password": "hunter2",
            "port": 5432,
            "enabled": true,
            "nested": { "a": 1 },
            "empty": null
        }))
        .unwrap();

        let flat = flatten_values(data);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat["password"], "hunter2");
        assert_eq!(flat["port"], "5432");
        assert_eq!(flat["enabled"], "true");
    }

    #[test]
    fn test_login_reply_without_lease() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"auth": {"client_token": "t"}}"#).unwrap();
        assert_eq!(reply.auth.lease_duration, 0);
        assert_eq!(reply.auth.client_token, "t");
    }
}
