//! KeyDbFactory: shared backend handle and instance creation
//!
//! A factory owns one backend connection plus the serializer, span namer and
//! per-operation timeout every instance inherits. Cloning a factory is cheap
//! and clones share the backend.

use std::sync::Arc;
use std::time::Duration;

use linkstore_core::{
    Context, JsonSerializer, Result, ResultExt, Retrier, RetryPolicy, Serializer, SpanNamer,
};
use linkstore_storage::{Backend, MemoryBackend, Ttl};

use crate::config::ClientConfig;
use crate::instance::Instance;

pub(crate) struct Shared<S> {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) serializer: S,
    pub(crate) namer: SpanNamer,
    op_timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl<S> Shared<S> {
    /// Context for one backend call: the caller's, bounded by the op timeout
    /// when the caller set no deadline
    pub(crate) fn scoped(&self, ctx: &Context) -> Context {
        match (ctx.deadline(), self.op_timeout) {
            (None, Some(timeout)) => ctx.with_timeout(timeout),
            _ => ctx.clone(),
        }
    }
}

/// Factory for [`Instance`]s sharing one backend
pub struct KeyDbFactory<S: Serializer = JsonSerializer> {
    shared: Arc<Shared<S>>,
}

impl<S: Serializer> Clone for KeyDbFactory<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Serializer> std::fmt::Debug for KeyDbFactory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDbFactory")
            .field("backend", &self.shared.backend)
            .field("namer", &self.shared.namer)
            .field("op_timeout", &self.shared.op_timeout)
            .finish()
    }
}

impl KeyDbFactory<JsonSerializer> {
    /// Connect to `backend` with JSON encoding
    ///
    /// # Errors
    ///
    /// Fails with "init key db client" when the backend does not answer a ping.
    pub fn new(config: &ClientConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        Self::with_serializer(config, backend, JsonSerializer)
    }

    /// Factory over a fresh [`MemoryBackend`]
    pub fn in_memory(config: &ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryBackend::new()))
    }
}

impl<S: Serializer> KeyDbFactory<S> {
    /// Connect to `backend` with a custom serializer
    pub fn with_serializer(
        config: &ClientConfig,
        backend: Arc<dyn Backend>,
        serializer: S,
    ) -> Result<Self> {
        backend
            .ping(&Context::background())
            .context("init key db client")?;

        tracing::debug!(
            op_timeout_ms = config.op_timeout_ms,
            serializer = std::any::type_name::<S>(),
            "key db client initialized"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                backend,
                serializer,
                namer: SpanNamer::new(config.span_prefix.clone(), config.span_suffix.clone()),
                op_timeout: config.op_timeout(),
                retry: config.retry.clone(),
            }),
        })
    }

    /// Create a keyspace scope; every `set` through it applies `ttl`
    pub fn new_instance(&self, name: impl Into<String>, ttl: Ttl) -> Instance<S> {
        Instance::new(Arc::clone(&self.shared), name.into(), ttl)
    }

    /// Close the backend; instances created from this factory stop working
    pub fn close(&self) -> Result<()> {
        self.shared.backend.close().context("close key db client")
    }

    /// The shared backend handle
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.shared.backend
    }

    /// Span namer handed to every instance
    pub fn namer(&self) -> &SpanNamer {
        &self.shared.namer
    }

    /// Retry executor configured from the `[retry]` section
    pub fn retrier(&self) -> Retrier {
        Retrier::new().with_policy(self.shared.retry.clone())
    }
}
