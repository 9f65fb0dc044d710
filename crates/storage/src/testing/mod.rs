//! Testing utilities for exercising backend failure paths
//!
//! - **Fault plans**: make a [`MemoryBackend`](crate::MemoryBackend) fail a
//!   chosen command so atomicity and error propagation can be observed
//!
//! # Example
//!
//! ```ignore
//! use linkstore_storage::{MemoryBackend, testing::FaultPlan};
//!
//! let backend = MemoryBackend::new();
//! // The second command executed from now on fails
//! backend.inject_fault(FaultPlan::fail_nth(1));
//! ```

mod fault;

pub use fault::{FaultPlan, FaultTrigger, INJECTED_FAULT};
