//! InviteLinkStore: invite links over two indexes
//!
//! - primary: `invite_link-hash-link-<hash>` holds the link's [`InviteLinkMeta`]
//! - secondary: `invite-link-channel-list-<channel_id>` lists the channel's
//!   hashes in insertion order
//!
//! Mutations touching both indexes go through one transaction handle, so
//! either both writes land or neither does. Reads take the indexes
//! independently; [`InviteLinkStore::get_last_link_channel_checked`] reports
//! a list entry whose record is missing as [`LinkLookup::Dangling`].
//!
//! The store never retries. Callers wanting retries wrap calls in a
//! [`Retrier`](linkstore_core::Retrier) excluding
//! [`InviteError::is_permanent`] errors.

use std::collections::HashSet;

use linkstore_client::{Instance, KeyDbFactory, Ttl, WriteCommands, LIST_LAST};
use linkstore_core::{Context, JsonSerializer, ResultExt, Serializer, SpanNamer};

use crate::error::{InviteError, Result};
use crate::link::{
    ChannelInviteLink, ChannelInviteLinkUpdateModel, InviteHash, InviteLink, InviteLinkMeta,
};

/// Instance name of the store's keyspace
pub const INSTANCE_NAME: &str = "invite_links_storage";

const KEY_PREFIX_LIST: &str = "invite-link-channel-list";
const KEY_PREFIX_LINK: &str = "invite_link-hash-link";

/// Secondary index key for a channel
pub fn channel_id_key(channel_id: i64) -> String {
    format!("{}-{}", KEY_PREFIX_LIST, channel_id)
}

/// Primary index key for a hash
///
/// Built from [`InviteHash::token`], so `+X` and the legacy `joinchat/X`
/// form of one hash are separate keys.
pub fn hash_link_key(hash: &InviteHash) -> String {
    format!("{}-{}", KEY_PREFIX_LINK, hash.token())
}

/// Outcome of reading a channel's most recent link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLookup {
    /// Last list entry and its metadata
    Found(ChannelInviteLink),
    /// Channel has no links
    Empty,
    /// Last list entry has no metadata record
    Dangling(InviteLink),
}

impl LinkLookup {
    /// The link, if one was found
    pub fn found(self) -> Option<ChannelInviteLink> {
        match self {
            LinkLookup::Found(link) => Some(link),
            LinkLookup::Empty | LinkLookup::Dangling(_) => None,
        }
    }
}

/// Invite-link store
#[derive(Debug, Clone)]
pub struct InviteLinkStore<S: Serializer = JsonSerializer> {
    client: Instance<S>,
    namer: SpanNamer,
}

impl<S: Serializer> InviteLinkStore<S> {
    /// Store on `factory`'s backend, in the persistent `invite_links_storage` instance
    pub fn new(factory: &KeyDbFactory<S>) -> Self {
        Self {
            client: factory.new_instance(INSTANCE_NAME, Ttl::Persistent),
            namer: factory.namer().clone(),
        }
    }

    /// Underlying instance
    pub fn instance(&self) -> &Instance<S> {
        &self.client
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Add one link
    ///
    /// # Errors
    ///
    /// - invalid link or metadata
    /// - [`InviteError::LinkAlreadyExists`] if the hash is already stored
    /// - backend failures; nothing is written in that case
    pub fn add_link(&self, ctx: &Context, link: &ChannelInviteLink) -> Result<()> {
        let span = self.namer.internal_span(concat!(module_path!(), "::add_link"));
        let _enter = span.enter();

        link.validate().map_err(|e| span.error(e))?;

        let mut tx = self.client.begin();
        if let Err(e) = self.add_link_into(ctx, link, &mut tx) {
            let _ = tx.rollback(ctx);
            return Err(span.error(e));
        }
        tx.commit(ctx).map_err(|e| span.error(InviteError::from(e)))
    }

    /// Add a batch of links in one transaction
    ///
    /// Invalid links are logged and skipped, as are hashes already stored or
    /// repeated within the batch. Any other failure aborts the whole batch.
    pub fn add_links(&self, ctx: &Context, links: &[ChannelInviteLink]) -> Result<()> {
        let span = self.namer.internal_span(concat!(module_path!(), "::add_links"));
        let _enter = span.enter();

        let mut tx = self.client.begin();
        let mut seen = HashSet::with_capacity(links.len());

        for link in links {
            if let Err(e) = link.validate() {
                tracing::error!(link = %link.link, error = %e, "add_links: invalid link skipped");
                continue;
            }
            if !seen.insert(hash_link_key(&link.link.hash())) {
                tracing::debug!(link = %link.link, "add_links: hash repeated in batch, skipped");
                continue;
            }
            match self.add_link_into(ctx, link, &mut tx) {
                Ok(()) | Err(InviteError::LinkAlreadyExists) => {}
                Err(e) => {
                    let _ = tx.rollback(ctx);
                    return Err(span.error(e));
                }
            }
        }

        tx.commit(ctx).map_err(|e| span.error(InviteError::from(e)))
    }

    /// Check the primary index, then write both indexes through `writer`
    fn add_link_into<W: WriteCommands>(
        &self,
        ctx: &Context,
        link: &ChannelInviteLink,
        writer: &mut W,
    ) -> Result<()> {
        let hash = link.link.hash();
        let key = hash_link_key(&hash);

        if self.client.is_exist(ctx, &key).context("check existence")? {
            return Err(InviteError::LinkAlreadyExists);
        }

        writer
            .rpush(ctx, &channel_id_key(link.meta.channel_id), &hash.token())
            .context("add link for the channel")?;
        writer.set(ctx, &key, &link.meta).context("save link")?;
        Ok(())
    }

    /// Remove a link from both indexes; absent links are not an error
    pub fn remove_link(&self, ctx: &Context, channel_id: i64, link: &InviteLink) -> Result<()> {
        let span = self.namer.internal_span(concat!(module_path!(), "::remove_link"));
        let _enter = span.enter();

        link.validate()
            .map_err(|e| span.error(InviteError::from(e)))?;

        let hash = link.hash();
        let mut tx = self.client.begin();

        let queued = tx
            .delete(ctx, &[&hash_link_key(&hash)])
            .context("delete link meta")
            .and_then(|_| {
                tx.remove_from_list(ctx, &channel_id_key(channel_id), &hash.token())
                    .context("remove from list")
            });
        if let Err(e) = queued {
            let _ = tx.rollback(ctx);
            return Err(span.error(InviteError::from(e)));
        }

        tx.commit(ctx).map_err(|e| span.error(InviteError::from(e)))
    }

    /// Apply a partial update to a stored link's metadata
    ///
    /// Single key write, no transaction; concurrent updates are last-write-wins.
    /// The merged metadata must still validate.
    pub fn update_link(&self, ctx: &Context, update: &ChannelInviteLinkUpdateModel) -> Result<()> {
        let span = self.namer.internal_span(concat!(module_path!(), "::update_link"));
        let _enter = span.enter();

        update.validate()?;

        let key = hash_link_key(&update.link.hash());
        let mut meta: InviteLinkMeta = match self.client.get(ctx, &key) {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => return Err(InviteError::LinkNotFound),
            Err(e) => {
                return Err(span.error(e.context("get actual version of link").into()));
            }
        };

        update.apply(&mut meta);
        meta.validate()?;

        self.client
            .set(ctx, &key, &meta)
            .context("update link")
            .map_err(|e| span.error(InviteError::from(e)))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Metadata stored for `link`'s hash
    pub fn get_link(&self, ctx: &Context, link: &InviteLink) -> Result<ChannelInviteLink> {
        let span = self.namer.internal_span(concat!(module_path!(), "::get_link"));
        let _enter = span.enter();

        match self.client.get(ctx, &hash_link_key(&link.hash())) {
            Ok(meta) => Ok(ChannelInviteLink {
                link: link.clone(),
                meta,
            }),
            Err(e) if e.is_not_found() => Err(InviteError::LinkNotFound),
            Err(e) => Err(span.error(e.context("get link").into())),
        }
    }

    /// All of a channel's links in insertion order, in canonical form
    pub fn get_channel_invite_links(&self, ctx: &Context, channel_id: i64) -> Result<Vec<InviteLink>> {
        let span = self
            .namer
            .internal_span(concat!(module_path!(), "::get_channel_invite_links"));
        let _enter = span.enter();

        let links: Vec<InviteLink> = match self.client.get_list(ctx, &channel_id_key(channel_id)) {
            Ok(links) => links,
            Err(e) if e.is_not_found() => return Err(InviteError::LinkNotFound),
            Err(e) => return Err(span.error(e.context("get list").into())),
        };
        if links.is_empty() {
            return Err(InviteError::LinkNotFound);
        }
        Ok(links.iter().map(InviteLink::to_full).collect())
    }

    /// The channel's most recently added link
    ///
    /// A list entry without metadata is logged and reported as
    /// [`InviteError::LinkNotFound`]; use
    /// [`get_last_link_channel_checked`](Self::get_last_link_channel_checked)
    /// to tell the two apart.
    pub fn get_last_link_channel(&self, ctx: &Context, channel_id: i64) -> Result<ChannelInviteLink> {
        self.get_last_link_channel_checked(ctx, channel_id)?
            .found()
            .ok_or(InviteError::LinkNotFound)
    }

    /// The channel's most recently added link, distinguishing a missing
    /// record from an empty channel
    ///
    /// Reads the list tail and the record separately, so an `add_link`
    /// racing with this call may surface as [`LinkLookup::Dangling`].
    pub fn get_last_link_channel_checked(&self, ctx: &Context, channel_id: i64) -> Result<LinkLookup> {
        let span = self
            .namer
            .internal_span(concat!(module_path!(), "::get_last_link_channel"));
        let _enter = span.enter();

        let last: InviteLink =
            match self
                .client
                .get_element_by_position(ctx, &channel_id_key(channel_id), LIST_LAST)
            {
                Ok(link) => link,
                Err(e) if e.is_not_found() => return Ok(LinkLookup::Empty),
                Err(e) => return Err(span.error(e.context("get last channel link").into())),
            };
        if last.is_empty() {
            return Ok(LinkLookup::Empty);
        }

        match self.client.get(ctx, &hash_link_key(&last.hash())) {
            Ok(meta) => Ok(LinkLookup::Found(ChannelInviteLink {
                link: last.to_full(),
                meta,
            })),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    link = %last.full(),
                    channel_id,
                    "there is link in channel list but there is no link meta"
                );
                Ok(LinkLookup::Dangling(last.to_full()))
            }
            Err(e) => Err(span.error(e.context("get link's meta information").into())),
        }
    }
}
