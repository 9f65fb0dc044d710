//! Operation instrumentation
//!
//! [`SpanNamer`] turns a qualified operation path (usually built with
//! `module_path!()`) into a readable span name by cutting a configured prefix
//! and suffix. It is constructed by the owner of a client and passed down;
//! there is no process-wide naming state.
//!
//! [`OpSpan`] is one instrumented operation: a `tracing` span carrying the
//! operation name, kind and attributes, with [`OpSpan::error`] recording a
//! failure on the span before handing the error back.

use std::fmt;

use tracing::Span;

/// Role of the instrumented operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Outbound call to a backend
    Client,
    /// In-process domain logic
    Internal,
}

impl SpanKind {
    /// Attribute value for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Client => "client",
            SpanKind::Internal => "internal",
        }
    }
}

/// Formats qualified operation paths into span names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanNamer {
    cut_prefix: String,
    cut_suffix: String,
}

impl SpanNamer {
    /// Create a namer that strips `cut_prefix` and `cut_suffix` when present
    pub fn new(cut_prefix: impl Into<String>, cut_suffix: impl Into<String>) -> Self {
        Self {
            cut_prefix: cut_prefix.into(),
            cut_suffix: cut_suffix.into(),
        }
    }

    /// Format a qualified path
    pub fn name(&self, path: &str) -> String {
        let mut name = path;
        if !self.cut_prefix.is_empty() {
            name = name.strip_prefix(self.cut_prefix.as_str()).unwrap_or(name);
        }
        if !self.cut_suffix.is_empty() {
            name = name.strip_suffix(self.cut_suffix.as_str()).unwrap_or(name);
        }
        name.to_string()
    }

    /// Start a span for an outbound call on the named keyspace instance
    pub fn client_span(&self, path: &str, instance: &str) -> OpSpan {
        let name = self.name(path);
        let span = tracing::debug_span!(
            "keydb",
            op = %name,
            kind = SpanKind::Client.as_str(),
            instance = %instance,
        );
        OpSpan { span, name }
    }

    /// Start a span for in-process domain logic
    pub fn internal_span(&self, path: &str) -> OpSpan {
        let name = self.name(path);
        let span = tracing::debug_span!("op", op = %name, kind = SpanKind::Internal.as_str());
        OpSpan { span, name }
    }
}

/// A single instrumented operation
#[derive(Debug, Clone)]
pub struct OpSpan {
    span: Span,
    name: String,
}

impl OpSpan {
    /// Formatted operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying `tracing` span
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the span for the lifetime of the returned guard
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record `err` on the span and return it
    pub fn error<E: fmt::Display>(&self, err: E) -> E {
        self.span.in_scope(|| {
            tracing::debug!(error = %err, op = %self.name, "operation failed");
        });
        err
    }
}
