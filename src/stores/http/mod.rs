//! HashiCorp Vault store over HTTP.
//!
//! Speaks the Vault v1 HTTP API with AppRole authentication and a KV v1
//! secrets engine.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | login | `POST auth/approle/login {role_id, secret_id}` |
//! | read secrets | `GET <path>` |
//! | list children | `LIST <path>` (404 reads as empty) |
//! | role exists | `GET auth/approle/role/<name>` (404 reads as false) |
//! | role-id | `GET auth/approle/role/<name>/role-id` |
//! | secret-id | `POST auth/approle/role/<name>/secret-id` |
//! | destroy secret-id | `POST auth/approle/role/<name>/secret-id/destroy {secret_id}` |
//!
//! # Example
//!
//! ```no_run
//! use vaultenv::stores::http::HttpStore;
//! use vaultenv::store::StoreClient;
//! use vaultenv::Config;
//!
//! #[tokio::main]
//! async fn main() -> vaultenv::Result<()> {
//!     let config = Config::new("https://vault.example.com:8200", "role-id", "secret-id");
//!     let store = HttpStore::new(&config)?;
//!
//!     let lease = store.login("role-id", "secret-id").await?;
//!     let keys = store.list_children(&lease.client_token, "secrets/team").await?;
//!     println!("{:?}", keys);
//!
//!     Ok(())
//! }
//! ```

mod store;
mod wire;

pub use store::HttpStore;
