//! Backend trait
//!
//! A backend executes [`Command`]s against a keyspace. Single commands are
//! applied immediately; [`Backend::execute_atomic`] applies a group in
//! submission order with all-or-nothing visibility.

use linkstore_core::{Context, Result};

use crate::command::{Command, Reply};

/// Key-value engine beneath the client
///
/// Implementations must be safe to share across threads: one backend handle
/// serves every instance created by a factory.
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Verify the backend is reachable
    fn ping(&self, ctx: &Context) -> Result<()>;

    /// Execute one command
    fn execute(&self, ctx: &Context, command: Command) -> Result<Reply>;

    /// Execute a group of commands atomically
    ///
    /// Either every command is applied and one reply per command is returned,
    /// or nothing is applied and the error of the first failing command is
    /// returned.
    fn execute_atomic(&self, ctx: &Context, commands: Vec<Command>) -> Result<Vec<Reply>>;

    /// Release the backend; subsequent calls fail
    fn close(&self) -> Result<()>;
}
