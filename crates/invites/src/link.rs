//! Invite-link value types
//!
//! An [`InviteLink`] is either a bare hash (`+5V23yMex8GY5ZWFi`, or the legacy
//! form without `+`) or a full join URL (`https://t.me/+5V23yMex8GY5ZWFi`,
//! `https://t.me/joinchat/5V23yMex8GY5ZWFi`). The hash is the token after the
//! last `/`.
//!
//! All shape rules live here; the store only calls `validate`, `hash` and
//! `full`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{InviteError, LinkError, MetaError};

/// Host of every channel link
pub const CHANNEL_LINK_HOST: &str = "t.me";
/// Prefix of canonical channel links
pub const CHANNEL_LINK_BASE: &str = "https://t.me/";
/// Minimum hash length, not counting a leading `+`
pub const MIN_HASH_LEN: usize = 16;

const INVITE_LINK_SCHEME: &str = "https";
const JOINCHAT_PREFIX: &str = "joinchat/";

// ============================================================================
// Hash
// ============================================================================

/// Identifying token of an invite link
///
/// `as_str` is the token without the `+` marker, so `https://t.me/+X` and
/// `+X` both give `X`. `token` keeps the marker and is what gets stored, so
/// a stored hash expands back to the same canonical link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InviteHash {
    value: String,
    private: bool,
}

impl InviteHash {
    fn parse(token: &str) -> Self {
        match token.strip_prefix('+') {
            Some(value) => Self {
                value: value.to_string(),
                private: true,
            },
            None => Self {
                value: token.to_string(),
                private: false,
            },
        }
    }

    /// Token without the `+` marker
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether the token carried the `+` marker
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Token as it appears in the link, `+` included
    pub fn token(&self) -> String {
        if self.private {
            format!("+{}", self.value)
        } else {
            self.value.clone()
        }
    }

    /// Check the minimum length
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.value.len() < MIN_HASH_LEN {
            return Err(LinkError::NotEnoughLen);
        }
        Ok(())
    }

    /// The hash as a bare-hash link
    pub fn to_link(&self) -> InviteLink {
        InviteLink(self.token())
    }
}

impl fmt::Display for InviteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ============================================================================
// InviteLink
// ============================================================================

/// Invite link string, bare hash or full URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteLink(String);

impl InviteLink {
    /// Wrap a link string without validating it
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }

    /// Raw link string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the link is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Token after the last `/`
    pub fn hash(&self) -> InviteHash {
        let token = self.0.rsplit('/').next().unwrap_or_default();
        InviteHash::parse(token)
    }

    /// Whether the link is a bare hash (contains no `/`)
    pub fn is_hash(&self) -> bool {
        !self.0.contains('/')
    }

    /// Canonical join URL
    ///
    /// Canonical links are returned unchanged, `+` hashes are prefixed with
    /// the channel-link base, anything else also gets the legacy
    /// `joinchat/` segment.
    pub fn full(&self) -> String {
        if self.0.starts_with(CHANNEL_LINK_BASE) {
            self.0.clone()
        } else if self.0.starts_with('+') {
            format!("{}{}", CHANNEL_LINK_BASE, self.0)
        } else {
            format!("{}{}{}", CHANNEL_LINK_BASE, JOINCHAT_PREFIX, self.0)
        }
    }

    /// The canonical form as a link
    pub fn to_full(&self) -> InviteLink {
        InviteLink(self.full())
    }

    /// Check hash length and, for URLs, scheme and host
    pub fn validate(&self) -> Result<(), LinkError> {
        self.hash().validate()?;
        if self.is_hash() {
            return Ok(());
        }

        let parts = LinkParts::parse(&self.0)?;
        if !parts.scheme.is_empty() && parts.scheme != INVITE_LINK_SCHEME {
            return Err(LinkError::InvalidScheme(parts.scheme));
        }
        if parts.host != CHANNEL_LINK_HOST {
            return Err(LinkError::InvalidHost(parts.host));
        }
        Ok(())
    }
}

impl fmt::Display for InviteLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InviteLink {
    fn from(link: &str) -> Self {
        Self::new(link)
    }
}

impl From<String> for InviteLink {
    fn from(link: String) -> Self {
        Self(link)
    }
}

/// Scheme and host of a link URL; empty when absent
struct LinkParts {
    scheme: String,
    host: String,
}

impl LinkParts {
    fn parse(raw: &str) -> Result<Self, LinkError> {
        // Scheme-relative links ("//t.me/...") carry a host but no scheme
        let (candidate, has_scheme) = match raw.strip_prefix("//") {
            Some(_) => (format!("{}:{}", INVITE_LINK_SCHEME, raw), false),
            None => (raw.to_string(), true),
        };

        match Url::parse(&candidate) {
            Ok(url) => {
                let host = if url.has_host() {
                    raw_authority(&candidate).to_string()
                } else {
                    String::new()
                };
                let scheme = if has_scheme {
                    url.scheme().to_string()
                } else {
                    String::new()
                };
                Ok(Self { scheme, host })
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self {
                scheme: String::new(),
                host: String::new(),
            }),
            Err(e) => Err(LinkError::InvalidUrl(e.to_string())),
        }
    }
}

/// Host and port exactly as written; `Url` lowercases hosts and drops default ports
fn raw_authority(link: &str) -> &str {
    let rest = link.split_once("://").map_or(link, |(_, rest)| rest);
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    authority.rsplit_once('@').map_or(authority, |(_, host)| host)
}

// ============================================================================
// Metadata
// ============================================================================

/// Timestamps where the zero instant `0001-01-01T00:00:00Z` means unset
mod zero_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const ZERO_UNIX_SECS: i64 = -62_135_596_800;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value.or_else(|| DateTime::from_timestamp(ZERO_UNIX_SECS, 0)) {
            Some(t) => t.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(value.filter(|t| !(t.timestamp() == ZERO_UNIX_SECS && t.timestamp_subsec_nanos() == 0)))
    }
}

/// Metadata stored under a link's hash
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InviteLinkMeta {
    /// Owning channel; must be non-zero
    #[serde(rename = "ChannelID")]
    pub channel_id: i64,
    /// Display name
    pub name: String,
    /// Whether joining needs admin approval
    pub approve_required: bool,
    /// Creation time; required
    #[serde(with = "zero_time")]
    pub created_at: Option<DateTime<Utc>>,
    /// Expiry; `None` means no expiry
    #[serde(with = "zero_time")]
    pub valid_to: Option<DateTime<Utc>>,
    /// Maximum joins, `0` for unlimited
    pub user_limit: u32,
}

impl InviteLinkMeta {
    /// Metadata for `channel_id` created at `created_at`
    pub fn new(channel_id: i64, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            channel_id,
            name: name.into(),
            created_at: Some(created_at),
            ..Default::default()
        }
    }

    /// Set approval requirement
    pub fn with_approve_required(mut self, approve_required: bool) -> Self {
        self.approve_required = approve_required;
        self
    }

    /// Set expiry
    pub fn with_valid_to(mut self, valid_to: DateTime<Utc>) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    /// Set join limit
    pub fn with_user_limit(mut self, user_limit: u32) -> Self {
        self.user_limit = user_limit;
        self
    }

    /// Check channel id and timestamps
    pub fn validate(&self) -> Result<(), MetaError> {
        if self.channel_id == 0 {
            return Err(MetaError::ChannelIdEmpty);
        }
        let created_at = self.created_at.ok_or(MetaError::InvalidCreatedAt)?;
        match self.valid_to {
            Some(valid_to) if valid_to < created_at => Err(MetaError::ValidToEarlierThanCreatedAt),
            _ => Ok(()),
        }
    }
}

/// A link together with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelInviteLink {
    /// The link
    pub link: InviteLink,
    /// Its metadata
    pub meta: InviteLinkMeta,
}

impl ChannelInviteLink {
    /// Pair a link with its metadata
    pub fn new(link: impl Into<InviteLink>, meta: InviteLinkMeta) -> Self {
        Self {
            link: link.into(),
            meta,
        }
    }

    /// Valid when both the link and the metadata are
    pub fn validate(&self) -> Result<(), InviteError> {
        self.link.validate()?;
        self.meta.validate()?;
        Ok(())
    }
}

/// Partial update of a stored link's metadata
///
/// `None` fields leave the stored value unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChannelInviteLinkUpdateModel {
    /// Link whose metadata is updated
    pub link: InviteLink,
    /// Owning channel; must be non-zero
    #[serde(rename = "ChannelID")]
    pub channel_id: i64,
    /// New display name
    pub name: Option<String>,
    /// New approval requirement
    pub approve_required: Option<bool>,
    /// New expiry
    pub valid_to: Option<DateTime<Utc>>,
    /// New join limit
    pub user_limit: Option<u32>,
}

impl ChannelInviteLinkUpdateModel {
    /// Update touching no fields yet
    pub fn new(link: impl Into<InviteLink>, channel_id: i64) -> Self {
        Self {
            link: link.into(),
            channel_id,
            ..Default::default()
        }
    }

    /// Change the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Change the approval requirement
    pub fn with_approve_required(mut self, approve_required: bool) -> Self {
        self.approve_required = Some(approve_required);
        self
    }

    /// Change the expiry
    pub fn with_valid_to(mut self, valid_to: DateTime<Utc>) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    /// Change the join limit
    pub fn with_user_limit(mut self, user_limit: u32) -> Self {
        self.user_limit = Some(user_limit);
        self
    }

    /// Valid link and non-zero channel id
    pub fn validate(&self) -> Result<(), InviteError> {
        self.link.validate()?;
        if self.channel_id == 0 {
            return Err(InviteError::InvalidUpdate(
                "channel id can't be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Overwrite the fields present in the update
    pub fn apply(&self, meta: &mut InviteLinkMeta) {
        if let Some(name) = &self.name {
            meta.name = name.clone();
        }
        if let Some(approve_required) = self.approve_required {
            meta.approve_required = approve_required;
        }
        if let Some(valid_to) = self.valid_to {
            meta.valid_to = Some(valid_to);
        }
        if let Some(user_limit) = self.user_limit {
            meta.user_limit = user_limit;
        }
    }
}
