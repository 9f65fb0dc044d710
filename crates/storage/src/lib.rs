//! Storage layer for linkstore
//!
//! This crate implements the key-value backend beneath the client:
//! - Command / Reply: the command vocabulary (strings and lists)
//! - Backend: trait for engines that execute single commands and atomic groups
//! - MemoryBackend: in-process engine with RwLock, lazy TTL expiry and
//!   all-or-nothing command groups
//! - testing: fault injection for exercising failure paths

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod command;
pub mod memory;
pub mod testing;

pub use backend::Backend;
pub use command::{Command, Reply, Ttl};
pub use memory::MemoryBackend;
