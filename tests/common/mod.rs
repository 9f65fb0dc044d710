//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

pub use linkstore::{
    ChannelInviteLink, ChannelInviteLinkUpdateModel, ClientConfig, Context, InviteError,
    InviteLink, InviteLinkMeta, InviteLinkStore, KeyDbFactory, MemoryBackend,
};

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Fixed creation time so stored metadata compares equal
pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap()
}

/// Store over a fresh memory backend; the backend is returned for inspection
pub fn memory_store(config: &ClientConfig) -> (Arc<MemoryBackend>, KeyDbFactory, InviteLinkStore) {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let factory = KeyDbFactory::new(config, backend.clone()).unwrap();
    let store = InviteLinkStore::new(&factory);
    (backend, factory, store)
}

/// Canonical private link number `i`
pub fn link(channel_id: i64, i: u32) -> InviteLink {
    InviteLink::new(format!("https://t.me/+{:0>10}{:0>6}", channel_id.unsigned_abs() % 10_000_000_000, i))
}

/// Valid link number `i` for `channel_id`
pub fn sample(channel_id: i64, i: u32) -> ChannelInviteLink {
    ChannelInviteLink::new(
        link(channel_id, i),
        InviteLinkMeta::new(channel_id, format!("link {}", i), created_at()),
    )
}
