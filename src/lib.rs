//! linkstore - invite-link storage over a transactional key-value client
//!
//! Invite links are kept in two indexes that change together: a record per
//! link hash, and an ordered list of hashes per channel. The store sits on a
//! small instrumented client with pluggable serialization and explicit
//! transaction handles.
//!
//! # Quick Start
//!
//! ```ignore
//! use linkstore::{ClientConfig, Context, KeyDbFactory, InviteLinkStore};
//! use linkstore::{ChannelInviteLink, InviteLinkMeta};
//!
//! let factory = KeyDbFactory::in_memory(&ClientConfig::default())?;
//! let store = InviteLinkStore::new(&factory);
//! let ctx = Context::background();
//!
//! let link = ChannelInviteLink::new(
//!     "https://t.me/+5V23yMex8GY5ZWFi",
//!     InviteLinkMeta::new(-1001234567, "launch", chrono::Utc::now()),
//! );
//! store.add_link(&ctx, &link)?;
//! let last = store.get_last_link_channel(&ctx, -1001234567)?;
//! ```
//!
//! # Architecture
//!
//! - `linkstore-core`: errors, context, serializers, spans, retry executor
//! - `linkstore-storage`: backend trait and the in-memory engine
//! - `linkstore-client`: factory, instances, transaction handles, config
//! - `linkstore-invites`: link value types and the invite-link store

pub use linkstore_client::{
    ClientConfig, ConfigError, Instance, KeyDbFactory, TransactionHandle, TxState, WriteCommands,
    LIST_FIRST, LIST_LAST,
};
pub use linkstore_core::{
    Context, Error, ErrorKind, JsonSerializer, MsgPackSerializer, Retrier, RetryPolicy,
    Serializer, SpanNamer,
};
pub use linkstore_invites::{
    ChannelInviteLink, ChannelInviteLinkUpdateModel, InviteError, InviteHash, InviteLink,
    InviteLinkMeta, InviteLinkStore, LinkError, LinkLookup, MetaError,
};
pub use linkstore_storage::{Backend, MemoryBackend, Ttl};
