//! Invite-link store end-to-end tests
//!
//! Exercises the public facade: configuration, factory, store and retries.

#[path = "../common/mod.rs"]
mod common;

mod concurrent_channels;
mod configured_store;
mod serializers;
