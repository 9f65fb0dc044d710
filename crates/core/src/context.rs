//! Cancellation and deadline propagation
//!
//! Every client operation takes a `&Context`. Backends check it before doing
//! work; a cancelled context or an elapsed deadline turns the call into
//! `Error::Cancelled` / `Error::DeadlineExceeded`.
//!
//! Contexts form a tree. Cancelling a parent cancels every child derived from
//! it, cancelling a child leaves the parent untouched, and a child's deadline
//! can only be earlier than its parent's.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Node {
    cancelled: AtomicBool,
    parent: Option<Arc<Node>>,
}

impl Node {
    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.parent.as_ref().map_or(false, |p| p.is_cancelled())
    }
}

/// Cancellable, deadline-carrying request context
///
/// Cheap to clone; clones share cancellation state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    node: Arc<Node>,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never cancelled, no deadline
    pub fn background() -> Self {
        Self::default()
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        Context {
            node: Arc::new(Node {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.node)),
            }),
            deadline,
        }
    }

    /// Derive a cancellable child with the same deadline
    pub fn with_cancel(&self) -> Self {
        self.child(self.deadline)
    }

    /// Derive a child whose deadline is at most `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        self.child(Some(effective))
    }

    /// Derive a child that expires `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this context and all contexts derived from it
    pub fn cancel(&self) {
        self.node.cancelled.store(true, Ordering::Release);
    }

    /// Whether this context or any ancestor was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.node.is_cancelled()
    }

    /// Effective deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline (`None` when there is no deadline)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail if the context is no longer usable
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_children() {
        let parent = Context::background();
        let child = parent.with_cancel();
        let grandchild = child.with_timeout(Duration::from_secs(60));

        parent.cancel();

        assert!(child.is_cancelled());
        assert_eq!(grandchild.check().unwrap_err().kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_cancel_does_not_propagate_upwards() {
        let parent = Context::background();
        let child = parent.with_cancel();

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_elapsed_deadline() {
        let ctx = Context::background().with_deadline(Instant::now());
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::DeadlineExceeded);
    }

    #[test]
    fn test_child_deadline_never_extends_parent() {
        let parent = Context::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
