//! Instance: a named keyspace scope over the shared backend
//!
//! All accessors:
//! - open a client span carrying the instance name
//! - bound the call by the factory's op timeout unless the caller set a deadline
//! - encode and decode through the factory's serializer
//! - wrap backend failures with the command they came from (`keydb.Get`, ...)
//!
//! Absent keys and list elements surface as [`Error::NotFound`] without
//! context wrapping; that is an expected outcome, not a failure, and is not
//! recorded on the span.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use linkstore_core::{Context, Error, JsonSerializer, OpSpan, Result, ResultExt, Serializer};
use linkstore_storage::{Command, Reply, Ttl};

use crate::factory::Shared;
use crate::transaction::{TransactionHandle, WriteCommands};

/// Position of the first list element
pub const LIST_FIRST: i64 = 0;
/// Position of the last list element
pub const LIST_LAST: i64 = -1;

pub(crate) fn unexpected_reply(command: &str, reply: &Reply) -> Error {
    Error::backend(format!("unexpected reply to {}: {:?}", command, reply))
}

/// Keyspace scope created by [`KeyDbFactory::new_instance`](crate::KeyDbFactory::new_instance)
pub struct Instance<S: Serializer = JsonSerializer> {
    pub(crate) shared: Arc<Shared<S>>,
    name: String,
    ttl: Ttl,
}

impl<S: Serializer> Clone for Instance<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            name: self.name.clone(),
            ttl: self.ttl,
        }
    }
}

impl<S: Serializer> std::fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<S: Serializer> Instance<S> {
    pub(crate) fn new(shared: Arc<Shared<S>>, name: String, ttl: Ttl) -> Self {
        Self { shared, name, ttl }
    }

    /// Instance name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expiry applied by `set`
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    pub(crate) fn span(&self, path: &str) -> OpSpan {
        self.shared.namer.client_span(path, &self.name)
    }

    pub(crate) fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        self.shared.serializer.marshal(value).context("marshal")
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        self.shared.serializer.unmarshal(data).context("unmarshal")
    }

    fn call(&self, ctx: &Context, command: Command) -> Result<Reply> {
        let ctx = self.shared.scoped(ctx);
        ctx.check()?;
        self.shared.backend.execute(&ctx, command)
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    /// Store `value` at `key` with the instance TTL
    pub fn set<T: Serialize + ?Sized>(&self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        let span = self.span(concat!(module_path!(), "::set"));
        let _enter = span.enter();

        let value = self.encode(value).map_err(|e| span.error(e))?;
        let command = Command::Set {
            key: key.to_string(),
            value,
            ttl: self.ttl,
        };
        self.call(ctx, command)
            .context("keydb.Set")
            .map_err(|e| span.error(e))?;
        Ok(())
    }

    /// Read the value at `key`
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> Result<T> {
        let span = self.span(concat!(module_path!(), "::get"));
        let _enter = span.enter();

        let reply = self
            .call(ctx, Command::Get { key: key.to_string() })
            .context("keydb.Get")
            .map_err(|e| span.error(e))?;
        match reply {
            Reply::Nil => Err(Error::NotFound),
            Reply::Bytes(bytes) => self.decode(&bytes).map_err(|e| span.error(e)),
            other => Err(span.error(unexpected_reply("GET", &other))),
        }
    }

    /// Whether `key` holds a value or a list
    pub fn is_exist(&self, ctx: &Context, key: &str) -> Result<bool> {
        let span = self.span(concat!(module_path!(), "::is_exist"));
        let _enter = span.enter();

        let reply = self
            .call(
                ctx,
                Command::Exists {
                    keys: vec![key.to_string()],
                },
            )
            .context("keydb.Exists")
            .map_err(|e| span.error(e))?;
        match reply {
            Reply::Int(n) => Ok(n > 0),
            other => Err(span.error(unexpected_reply("EXISTS", &other))),
        }
    }

    /// Remove `keys`; absent keys are not an error
    pub fn delete(&self, ctx: &Context, keys: &[&str]) -> Result<()> {
        let span = self.span(concat!(module_path!(), "::delete"));
        let _enter = span.enter();

        if keys.is_empty() {
            return Ok(());
        }
        let command = Command::Del {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        };
        self.call(ctx, command)
            .context("keydb.Del")
            .map_err(|e| span.error(e))?;
        Ok(())
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// Append `value` to the tail of the list at `key`
    pub fn rpush<T: Serialize + ?Sized>(&self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        let span = self.span(concat!(module_path!(), "::rpush"));
        let _enter = span.enter();

        let value = self.encode(value).map_err(|e| span.error(e))?;
        let command = Command::RPush {
            key: key.to_string(),
            values: vec![value],
        };
        self.call(ctx, command)
            .context("keydb.RPush")
            .map_err(|e| span.error(e))?;
        Ok(())
    }

    /// Prepend `value` to the head of the list at `key`
    pub fn lpush<T: Serialize + ?Sized>(&self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        let span = self.span(concat!(module_path!(), "::lpush"));
        let _enter = span.enter();

        let value = self.encode(value).map_err(|e| span.error(e))?;
        let command = Command::LPush {
            key: key.to_string(),
            values: vec![value],
        };
        self.call(ctx, command)
            .context("keydb.LPush")
            .map_err(|e| span.error(e))?;
        Ok(())
    }

    /// Remove and decode the tail element
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the list is empty or absent.
    pub fn rpop<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> Result<T> {
        let span = self.span(concat!(module_path!(), "::rpop"));
        let _enter = span.enter();

        let reply = self
            .call(ctx, Command::RPop { key: key.to_string() })
            .context("keydb.RPop")
            .map_err(|e| span.error(e))?;
        self.element(&span, "RPOP", reply)
    }

    /// Remove and decode the head element
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the list is empty or absent.
    pub fn lpop<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> Result<T> {
        let span = self.span(concat!(module_path!(), "::lpop"));
        let _enter = span.enter();

        let reply = self
            .call(ctx, Command::LPop { key: key.to_string() })
            .context("keydb.LPop")
            .map_err(|e| span.error(e))?;
        self.element(&span, "LPOP", reply)
    }

    /// Decode the whole list in order
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the list is empty or absent.
    pub fn get_list<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> Result<Vec<T>> {
        let span = self.span(concat!(module_path!(), "::get_list"));
        let _enter = span.enter();

        let command = Command::LRange {
            key: key.to_string(),
            start: LIST_FIRST,
            stop: LIST_LAST,
        };
        let reply = self
            .call(ctx, command)
            .context("keydb.LRange")
            .map_err(|e| span.error(e))?;
        match reply {
            Reply::Array(items) if items.is_empty() => Err(Error::NotFound),
            Reply::Array(items) => self
                .shared
                .serializer
                .unmarshal_seq(&items)
                .context("unmarshal")
                .map_err(|e| span.error(e)),
            other => Err(span.error(unexpected_reply("LRANGE", &other))),
        }
    }

    /// Decode the element at `position`; negative positions count from the tail
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when `position` is out of range.
    pub fn get_element_by_position<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        key: &str,
        position: i64,
    ) -> Result<T> {
        let span = self.span(concat!(module_path!(), "::get_element_by_position"));
        let _enter = span.enter();

        let command = Command::LIndex {
            key: key.to_string(),
            index: position,
        };
        let reply = self
            .call(ctx, command)
            .context("keydb.LIndex")
            .map_err(|e| span.error(e))?;
        self.element(&span, "LINDEX", reply)
    }

    /// Remove the first element whose encoding equals that of `value`
    pub fn remove_from_list<T: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let span = self.span(concat!(module_path!(), "::remove_from_list"));
        let _enter = span.enter();

        let value = self.encode(value).map_err(|e| span.error(e))?;
        let command = Command::LRem {
            key: key.to_string(),
            count: 1,
            value,
        };
        self.call(ctx, command)
            .context("keydb.LRem")
            .map_err(|e| span.error(e))?;
        Ok(())
    }

    fn element<T: DeserializeOwned>(&self, span: &OpSpan, command: &str, reply: Reply) -> Result<T> {
        match reply {
            Reply::Nil => Err(Error::NotFound),
            Reply::Bytes(bytes) => self.decode(&bytes).map_err(|e| span.error(e)),
            other => Err(span.error(unexpected_reply(command, &other))),
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start a command group
    ///
    /// Writes issued through the returned handle are queued and applied
    /// together by [`TransactionHandle::commit`].
    pub fn begin(&self) -> TransactionHandle<S> {
        let span = self.span(concat!(module_path!(), "::begin"));
        let _enter = span.enter();
        TransactionHandle::new(self.clone())
    }
}

impl<S: Serializer> WriteCommands for Instance<S> {
    fn set<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        Instance::set(self, ctx, key, value)
    }

    fn delete(&mut self, ctx: &Context, keys: &[&str]) -> Result<()> {
        Instance::delete(self, ctx, keys)
    }

    fn rpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        Instance::rpush(self, ctx, key, value)
    }

    fn lpush<T: Serialize + ?Sized>(&mut self, ctx: &Context, key: &str, value: &T) -> Result<()> {
        Instance::lpush(self, ctx, key, value)
    }

    fn remove_from_list<T: Serialize + ?Sized>(
        &mut self,
        ctx: &Context,
        key: &str,
        value: &T,
    ) -> Result<()> {
        Instance::remove_from_list(self, ctx, key, value)
    }
}
