//! Vaultenv - per-workload environment secrets from HashiCorp Vault.
//!
//! Vaultenv resolves the environment a workload should start with. It holds
//! one long-lived root AppRole session, finds the most specific AppRole that
//! matches the workload, and reads the workload's secrets through a
//! short-lived session of that role. The secret-id minted for the delegated
//! session is destroyed as soon as the secrets are read.
//!
//! # Features
//!
//! - **Role discovery**: `/team/app/task` tries `mesos-team-app-task`,
//!   `mesos-team-app`, then `mesos-team`
//! - **Delegation**: reads happen with the workload's own role, never root
//! - **Async/Await**: Built on tokio for non-blocking I/O
//! - **Session Caching**: The root session is reused until its lease runs low
//! - **Testable**: An in-memory store with error injection (`mock` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use vaultenv::{Config, SecretAggregator};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> vaultenv::Result<()> {
//!     let config = Config::from_file("/etc/vaultenv.json").await?;
//!     let aggregator = SecretAggregator::new(config)?;
//!
//!     let resolved = aggregator
//!         .resolve("/team/app/task", &HashMap::new(), &HashMap::new())
//!         .await?;
//!
//!     for (name, value) in resolved.all_secrets() {
//!         std::env::set_var(name, value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Provides |
//! |---------|---------|----------|
//! | `mock` | yes | [`stores::mock::MockStore`] |

pub mod aggregate;
pub mod config;
pub mod delegate;
pub mod error;
pub mod path;
pub mod role;
pub mod secrets;
pub mod session;
pub mod store;
pub mod stores;

pub use aggregate::SecretAggregator;
pub use config::{Config, Credentials, TlsConfig};
pub use delegate::elevate;
pub use error::{Result, VaultenvError};
pub use role::{AppRole, RoleResolver};
pub use secrets::ResolvedSecrets;
pub use session::{Session, SessionManager};
pub use store::StoreClient;
