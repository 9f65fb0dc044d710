//! Invite-link storage
//!
//! - link: `InviteLink`, `InviteHash`, metadata and update model, with validation
//! - store: `InviteLinkStore`, keeping the hash index and the per-channel
//!   list consistent through client transactions
//! - error: `InviteError` and the validation error enums

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod link;
pub mod store;

pub use error::{InviteError, LinkError, MetaError, Result};
pub use link::{
    ChannelInviteLink, ChannelInviteLinkUpdateModel, InviteHash, InviteLink, InviteLinkMeta,
    CHANNEL_LINK_BASE, CHANNEL_LINK_HOST, MIN_HASH_LEN,
};
pub use store::{channel_id_key, hash_link_key, InviteLinkStore, LinkLookup, INSTANCE_NAME};
