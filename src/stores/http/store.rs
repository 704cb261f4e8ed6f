//! Vault HTTP store implementation.

use super::wire::{
    flatten_values, DestroyRequest, ListData, LoginReply, LoginRequest, Reply, RoleIdData,
    SecretIdData,
};
use crate::config::TlsConfig;
use crate::path::normalize;
use crate::store::{AuthLease, StoreClient};
use crate::{Config, Result, VaultenvError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

const TOKEN_HEADER: &str = "X-Vault-Token";
const LOGIN_PATH: &str = "auth/approle/login";

/// HashiCorp Vault store.
///
/// Talks to the Vault HTTP API with `reqwest`. Every request is bounded by
/// the configured timeout; a timed-out request surfaces as
/// [`VaultenvError::Http`].
#[derive(Debug, Clone)]
pub struct HttpStore {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    fn user_agent() -> String {
        format!("vaultenv/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Creates a store client from configuration.
    ///
    /// # Errors
    ///
    /// - [`VaultenvError::InvalidConfig`]: the URL does not parse
    /// - [`VaultenvError::Io`]: TLS material cannot be read
    /// - [`VaultenvError::Http`]: TLS material is not valid PEM
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| VaultenvError::InvalidConfig(format!("vault_url {}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(VaultenvError::InvalidConfig(format!(
                "vault_url cannot be a base: {}",
                config.url
            )));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(Self::user_agent())
            .timeout(config.timeout)
            .use_rustls_tls();

        if let Some(ref tls) = config.tls {
            builder = apply_tls(builder, tls)?;
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("v1")
                .extend(normalize(path).split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Sends a request and decodes the `data` envelope of a success reply.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(method, path, Some(token), body).await?;
        if !response.status().is_success() {
            return Err(store_failure(path, response).await);
        }
        decode_data(&response.bytes().await?)
    }
}

fn apply_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &TlsConfig,
) -> Result<reqwest::ClientBuilder> {
    if tls.verify == Some(false) {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(ref ca) = tls.ca_pem_file {
        let pem = std::fs::read(ca)?;
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
    }

    if let (Some(cert), Some(key)) = (&tls.client_pem_file, &tls.client_key_pem_file) {
        let mut pem = std::fs::read(cert)?;
        pem.push(b'\n');
        pem.extend(std::fs::read(key)?);
        builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
    }

    Ok(builder)
}

fn decode_data<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let reply: Reply<T> = serde_json::from_slice(body)?;
    Ok(reply.data)
}

async fn store_failure(path: &str, response: reqwest::Response) -> VaultenvError {
    let code = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    VaultenvError::store(code, normalize(path), message)
}

fn role_path(role: &str) -> String {
    format!("auth/approle/role/{}", normalize(role))
}

fn list_method() -> Method {
    // LIST is a Vault extension verb; the literal is a valid token.
    Method::from_bytes(b"LIST").unwrap_or(Method::GET)
}

#[async_trait]
impl StoreClient for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn login(&self, role_id: &str, secret_id: &str) -> Result<AuthLease> {
        let body = LoginRequest { role_id, secret_id };
        let response = self.send(Method::POST, LOGIN_PATH, None, Some(&body)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VaultenvError::Auth {
                code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let reply: LoginReply = serde_json::from_slice(&response.bytes().await?)?;
        Ok(AuthLease {
            client_token: reply.auth.client_token,
            lease_duration: reply.auth.lease_duration,
        })
    }

    async fn read_secrets(&self, token: &str, path: &str) -> Result<HashMap<String, String>> {
        let response = self.send::<()>(Method::GET, path, Some(token), None).await?;
        if !response.status().is_success() {
            return Err(store_failure(path, response).await);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(HashMap::new());
        }
        let data: Option<HashMap<String, serde_json::Value>> = decode_data(&body)?;
        Ok(data.map(flatten_values).unwrap_or_default())
    }

    async fn list_children(&self, token: &str, path: &str) -> Result<Vec<String>> {
        let response = self.send::<()>(list_method(), path, Some(token), None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                let data: ListData = decode_data(&response.bytes().await?)?;
                Ok(data.keys)
            }
            _ => Err(store_failure(path, response).await),
        }
    }

    async fn role_exists(&self, token: &str, role: &str) -> Result<bool> {
        let path = role_path(role);
        let response = self.send::<()>(Method::GET, &path, Some(token), None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(store_failure(&path, response).await),
        }
    }

    async fn issue_role_id(&self, token: &str, role: &str) -> Result<String> {
        let path = format!("{}/role-id", role_path(role));
        let data: RoleIdData = self.call(Method::GET, &path, token, None).await?;
        Ok(data.role_id)
    }

    async fn issue_secret_id(&self, token: &str, role: &str) -> Result<String> {
        let path = format!("{}/secret-id", role_path(role));
        let data: SecretIdData = self
            .call(Method::POST, &path, token, Some(&serde_json::json!({})))
            .await?;
        Ok(data.secret_id)
    }

    async fn destroy_secret_id(&self, token: &str, role: &str, secret_id: &str) -> Result<()> {
        let path = format!("{}/secret-id/destroy", role_path(role));
        let body = DestroyRequest { secret_id };
        let response = self.send(Method::POST, &path, Some(token), Some(&body)).await?;
        if !response.status().is_success() {
            return Err(store_failure(&path, response).await);
        }
        Ok(())
    }
}
