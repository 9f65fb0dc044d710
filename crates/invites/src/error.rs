//! Error types for invite links
//!
//! Validation failures are split by what failed: [`LinkError`] for the link
//! string, [`MetaError`] for its metadata. [`InviteError`] is what the store
//! returns; backend failures arrive wrapped as [`InviteError::Store`] with the
//! step that failed as context.

use thiserror::Error;

use crate::link::MIN_HASH_LEN;

/// Result type alias for invite-link operations
pub type Result<T> = std::result::Result<T, InviteError>;

/// The link string is not a usable invite link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Hash shorter than [`MIN_HASH_LEN`]
    #[error("invalid invite link: invite link hash can't be less than {}", MIN_HASH_LEN)]
    NotEnoughLen,

    /// Not parseable as a URL
    #[error("invalid invite link: {0}")]
    InvalidUrl(String),

    /// URL scheme other than https
    #[error("invalid invite link: invalid schema '{0}'")]
    InvalidScheme(String),

    /// URL host other than the channel-link host
    #[error("invalid invite link: invalid host '{0}'")]
    InvalidHost(String),
}

/// The link metadata is inconsistent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    /// Channel id is zero
    #[error("invalid meta of invite link: empty channel id")]
    ChannelIdEmpty,

    /// Creation time unset
    #[error("invalid meta of invite link: invalid created at")]
    InvalidCreatedAt,

    /// Expiry earlier than creation
    #[error("invalid meta of invite link: valid to field should be later than created at")]
    ValidToEarlierThanCreatedAt,
}

/// Errors returned by the invite-link store
#[derive(Debug, Error)]
pub enum InviteError {
    /// Link string failed validation
    #[error(transparent)]
    InvalidInviteLink(#[from] LinkError),

    /// Metadata failed validation
    #[error(transparent)]
    InvalidInviteLinkMeta(#[from] MetaError),

    /// Update request failed validation
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// No record for the hash, or no links for the channel
    #[error("link not found")]
    LinkNotFound,

    /// A record already exists for the hash
    #[error("link already exists, use update_link instead of add_link")]
    LinkAlreadyExists,

    /// Backend, serialization or transaction failure
    #[error("store error: {0}")]
    Store(#[from] linkstore_core::Error),
}

impl InviteError {
    /// Whether the caller supplied invalid input
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            InviteError::InvalidInviteLink(_)
                | InviteError::InvalidInviteLinkMeta(_)
                | InviteError::InvalidUpdate(_)
        )
    }

    /// Whether retrying the same call cannot succeed
    ///
    /// Suitable as a [`Retrier`](linkstore_core::Retrier) exclusion.
    pub fn is_permanent(&self) -> bool {
        self.is_invalid_input()
            || matches!(
                self,
                InviteError::LinkNotFound | InviteError::LinkAlreadyExists
            )
    }
}
