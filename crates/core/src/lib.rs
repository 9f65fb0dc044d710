//! Core types and traits for linkstore
//!
//! This crate defines the foundational pieces shared by every layer:
//! - Error: error taxonomy with chain-aware kind matching
//! - Context: cancellation and deadline propagation for backend calls
//! - Serializer: pluggable value encoding (JSON, MessagePack)
//! - SpanNamer / OpSpan: operation instrumentation on top of `tracing`
//! - Retrier: bounded exponential-backoff retry executor

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod retry;
pub mod serializer;
pub mod trace;

pub use context::Context;
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use retry::{Retrier, RetryPolicy, Sleeper, ThreadSleeper};
pub use serializer::{JsonSerializer, MsgPackSerializer, Serializer};
pub use trace::{OpSpan, SpanKind, SpanNamer};
