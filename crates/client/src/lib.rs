//! Key-value client for linkstore
//!
//! - KeyDbFactory: owns the backend connection, serializer and span namer
//! - Instance: named keyspace scope with TTL; scalar and list accessors
//! - TransactionHandle: queued writes applied atomically on commit
//! - WriteCommands: write operations shared by instances and handles
//! - ClientConfig: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod factory;
pub mod instance;
pub mod transaction;

pub use config::{ClientConfig, CONFIG_FILE_NAME};
pub use error::ConfigError;
pub use factory::KeyDbFactory;
pub use instance::{Instance, LIST_FIRST, LIST_LAST};
pub use transaction::{TransactionHandle, TxState, WriteCommands};

pub use linkstore_storage::Ttl;
