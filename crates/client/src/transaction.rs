//! Transaction handles and the shared write-operation set
//!
//! [`TransactionHandle`] is a distinct type from [`Instance`]: writes issued
//! through it are queued as commands and reach the backend only on
//! [`commit`](TransactionHandle::commit), as one atomic group. A handle has
//! no read accessors and no `begin`, so it cannot be mistaken for the live
//! instance and groups cannot nest.
//!
//! Lifecycle: `Open` until the first `commit` or `rollback`.
//! - `commit` on a finished handle fails with [`Error::NoTransaction`]
//! - `rollback` on a finished handle is a no-op
//! - queuing on a finished handle fails with [`Error::NoTransaction`]
//! - dropping an open handle discards its queue

use serde::Serialize;

use linkstore_core::{Context, Error, JsonSerializer, Result, Serializer};
use linkstore_storage::Command;

use crate::instance::Instance;

/// Writes available on both the live instance and a transaction handle
///
/// Domain code that only writes can be generic over this trait and run
/// either immediately or inside a group.
pub trait WriteCommands {
    /// Store `value` at `key`
    fn set<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()>;

    /// Remove `keys`
    fn delete(&mut self, ctx: &Context, keys: &[&str]) -> Result<()>;

    /// Append to the tail of a list
    fn rpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()>;

    /// Prepend to the head of a list
    fn lpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()>;

    /// Remove the first list element matching `value`
    fn remove_from_list<T: Serialize + ?Sized>(
        &mut self,
        ctx: &Context,
        key: &str,
        value: &T,
    ) -> Result<()>;
}

/// Lifecycle state of a [`TransactionHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Accepting commands
    Open,
    /// Queue applied
    Committed,
    /// Queue discarded, explicitly or by a failed commit
    RolledBack,
}

/// Buffered command group over one instance
///
/// Not meant for concurrent use; a handle belongs to one caller from
/// `begin` to `commit`/`rollback`.
#[derive(Debug)]
pub struct TransactionHandle<S: Serializer = JsonSerializer> {
    instance: Instance<S>,
    queue: Vec<Command>,
    state: TxState,
}

impl<S: Serializer> TransactionHandle<S> {
    pub(crate) fn new(instance: Instance<S>) -> Self {
        Self {
            instance,
            queue: Vec::new(),
            state: TxState::Open,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Whether commands can still be queued
    pub fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn enqueue(&mut self, ctx: &Context, command: Command) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NoTransaction);
        }
        ctx.check()?;
        tracing::trace!(command = command.name(), queued = self.queue.len() + 1, "queued");
        self.queue.push(command);
        Ok(())
    }

    /// Queue a write of `value` at `key`
    pub fn set<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        let value = self.instance.encode(value)?;
        self.enqueue(
            ctx,
            Command::Set {
                key: key.to_string(),
                value,
                ttl: self.instance.ttl(),
            },
        )
    }

    /// Queue removal of `keys`
    pub fn delete(&mut self, ctx: &Context, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.enqueue(
            ctx,
            Command::Del {
                keys: keys.iter().map(|k| k.to_string()).collect(),
            },
        )
    }

    /// Queue an append to the tail of a list
    pub fn rpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        let value = self.instance.encode(value)?;
        self.enqueue(
            ctx,
            Command::RPush {
                key: key.to_string(),
                values: vec![value],
            },
        )
    }

    /// Queue a prepend to the head of a list
    pub fn lpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        let value = self.instance.encode(value)?;
        self.enqueue(
            ctx,
            Command::LPush {
                key: key.to_string(),
                values: vec![value],
            },
        )
    }

    /// Queue removal of the first list element matching `value`
    pub fn remove_from_list<T: Serialize + ?Sized>(
        &mut self,
        ctx: &Context,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let value = self.instance.encode(value)?;
        self.enqueue(
            ctx,
            Command::LRem {
                key: key.to_string(),
                count: 1,
                value,
            },
        )
    }

    /// Apply every queued command atomically, in submission order
    ///
    /// # Errors
    ///
    /// [`Error::NoTransaction`] if the handle was already committed or rolled
    /// back; otherwise the backend failure wrapped as "commit transaction".
    /// A failed commit applies nothing and finishes the handle.
    pub fn commit(&mut self, ctx: &Context) -> Result<()> {
        let span = self.instance.span(concat!(module_path!(), "::commit"));
        let _enter = span.enter();

        if !self.is_open() {
            return Err(span.error(Error::NoTransaction));
        }
        let queue = std::mem::take(&mut self.queue);
        if queue.is_empty() {
            self.state = TxState::Committed;
            return Ok(());
        }

        let count = queue.len();
        let ctx = self.instance.shared.scoped(ctx);
        let result = ctx
            .check()
            .and_then(|_| self.instance.shared.backend.execute_atomic(&ctx, queue));
        match result {
            Ok(_) => {
                self.state = TxState::Committed;
                tracing::debug!(commands = count, "transaction committed");
                Ok(())
            }
            Err(e) => {
                self.state = TxState::RolledBack;
                Err(span.error(e.context("commit transaction")))
            }
        }
    }

    /// Discard queued commands; no-op once the handle is finished
    pub fn rollback(&mut self, _ctx: &Context) -> Result<()> {
        let span = self.instance.span(concat!(module_path!(), "::rollback"));
        let _enter = span.enter();

        if self.is_open() {
            tracing::debug!(discarded = self.queue.len(), "transaction rolled back");
            self.queue.clear();
            self.state = TxState::RolledBack;
        }
        Ok(())
    }
}

impl<S: Serializer> Drop for TransactionHandle<S> {
    fn drop(&mut self) {
        if self.is_open() && !self.queue.is_empty() {
            tracing::debug!(
                instance = self.instance.name(),
                discarded = self.queue.len(),
                "open transaction dropped, queued commands discarded"
            );
        }
    }
}

impl<S: Serializer> WriteCommands for TransactionHandle<S> {
    fn set<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        TransactionHandle::set(self, ctx, key, value)
    }

    fn delete(&mut self, ctx: &Context, keys: &[&str]) -> Result<()> {
        TransactionHandle::delete(self, ctx, keys)
    }

    fn rpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        TransactionHandle::rpush(self, ctx, key, value)
    }

    fn lpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        TransactionHandle::lpush(self, ctx, key, value)
    }

    fn remove_from_list<T: Serialize + ?Sized>(
        &mut self,
        ctx: &Context,
        key: &str,
        value: &T,
    ) -> Result<()> {
        TransactionHandle::remove_from_list(self, ctx, key, value)
    }
}
