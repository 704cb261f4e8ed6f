//! End-to-end tests against a Vault API simulated with wiremock.
//!
//! Run with:
//!   cargo test --test integration_vault

use serde_json::json;
use std::collections::HashMap;
use std::sync::Once;
use vaultenv::{Config, SecretAggregator, VaultenvError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn config(server: &MockServer) -> Config {
    Config::new(server.uri(), "root-role-id", "root-secret-id")
        .with_role_prefix("mesos")
        .with_default_secrets_path("secrets_v1/mesos")
}

async fn mount_login(server: &MockServer, role_id: &str, secret_id: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({"role_id": role_id, "secret_id": secret_id})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": {"client_token": token, "lease_duration": 3600}
        })))
        .mount(server)
        .await;
}

async fn mount_role(server: &MockServer, role: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/auth/approle/role/{}", role)))
        .and(header("x-vault-token", "root-token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"data": {}})))
        .mount(server)
        .await;
}

/// Mounts role-id lookup, secret-id issuance and a destroy that must be hit
/// exactly once with the root token.
async fn mount_delegation(server: &MockServer, role: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/auth/approle/role/{}/role-id", role)))
        .and(header("x-vault-token", "root-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"role_id": "app-role-id"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/auth/approle/role/{}/secret-id", role)))
        .and(header("x-vault-token", "root-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"secret_id": "app-secret-id", "secret_id_accessor": "acc"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/auth/approle/role/{}/secret-id/destroy", role)))
        .and(header("x-vault-token", "root-token"))
        .and(body_json(json!({"secret_id": "app-secret-id"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;

    mount_login(server, "app-role-id", "app-secret-id", "app-token").await;
}

#[tokio::test]
async fn test_resolve_workload_end_to_end() {
    init_tracing();
    let server = MockServer::start().await;

    mount_login(&server, "root-role-id", "root-secret-id", "root-token").await;
    mount_role(&server, "mesos-team-app-task", 404).await;
    mount_role(&server, "mesos-team-app", 200).await;
    mount_delegation(&server, "mesos-team-app").await;

    Mock::given(method("LIST"))
        .and(path("/v1/secrets_v1/mesos/team/app"))
        .and(header("x-vault-token", "app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"keys": ["passwords", "nested/"]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/secrets_v1/mesos/team/app/passwords"))
        .and(header("x-vault-token", "app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"some-secret-key": "default-value", "db": "hunter2"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/secrets_v1/shared/api"))
        .and(header("x-vault-token", "app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"token": "t0k"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/secrets_v1/shared/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": ["permission denied"]
        })))
        .mount(&server)
        .await;

    let aggregator = SecretAggregator::new(config(&server)).unwrap();
    let custom = HashMap::from([
        ("API_TOKEN".to_string(), "secrets_v1/shared/api@token".to_string()),
        (
            "PASSWORDS_DB".to_string(),
            "secrets_v1/shared/api@token".to_string(),
        ),
        (
            "DENIED".to_string(),
            "secrets_v1/shared/forbidden@key".to_string(),
        ),
    ]);

    let resolved = aggregator
        .resolve("/team/app/task", &custom, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(resolved.role.name, "mesos-team-app");

    let all = resolved.all_secrets();
    assert_eq!(all["PASSWORDS_SOME_SECRET_KEY"], "default-value");
    assert_eq!(all["PASSWORDS_DB"], "t0k");
    assert_eq!(all["API_TOKEN"], "t0k");
    assert_eq!(all["DENIED"], "");
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_resolve_without_role_is_no_role() {
    init_tracing();
    let server = MockServer::start().await;

    mount_login(&server, "root-role-id", "root-secret-id", "root-token").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/role/mesos-team/secret-id"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let aggregator = SecretAggregator::new(config(&server)).unwrap();
    let err = aggregator
        .resolve("/team/app", &HashMap::new(), &HashMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultenvError::NoRole(ref id) if id == "/team/app"));
}

#[tokio::test]
async fn test_root_login_rejected() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": ["invalid role or secret ID"]
        })))
        .mount(&server)
        .await;

    let aggregator = SecretAggregator::new(config(&server)).unwrap();
    let err = aggregator
        .resolve("/team/app", &HashMap::new(), &HashMap::new())
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
    assert_eq!(err.status_code(), Some(400));
}

#[tokio::test]
async fn test_default_read_failure_still_destroys_secret_id() {
    init_tracing();
    let server = MockServer::start().await;

    mount_login(&server, "root-role-id", "root-secret-id", "root-token").await;
    mount_role(&server, "mesos-app", 200).await;
    mount_delegation(&server, "mesos-app").await;

    Mock::given(method("LIST"))
        .and(path("/v1/secrets_v1/mesos/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"keys": ["db"]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secrets_v1/mesos/app/db"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let aggregator = SecretAggregator::new(config(&server)).unwrap();
    let err = aggregator
        .resolve("app", &HashMap::new(), &HashMap::new())
        .await
        .unwrap_err();

    assert!(err.is_store_error());
    assert_eq!(err.status_code(), Some(500));
    // MockServer verifies the single destroy call on drop.
}
