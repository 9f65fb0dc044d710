//! Fault injection for the in-memory backend
//!
//! A [`FaultPlan`] watches every command the backend is about to apply and
//! turns the matching ones into a backend error. Commands are counted across
//! single calls and atomic groups alike, starting from zero when the plan is
//! installed.

use linkstore_core::Error;

use crate::command::Command;

/// Message carried by injected errors
pub const INJECTED_FAULT: &str = "injected fault";

/// Which commands a plan fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultTrigger {
    /// The command at this zero-based position
    Nth(usize),
    /// Any command touching this key
    Key(String),
    /// Any command with this name (`"SET"`, `"RPUSH"`, ...)
    Command(&'static str),
}

/// Plan describing which commands fail and how often
#[derive(Debug, Clone)]
pub struct FaultPlan {
    /// What to match
    pub trigger: FaultTrigger,
    /// How many matches fail before the plan goes quiet; `None` is unlimited
    pub times: Option<usize>,
    seen: usize,
    fired: usize,
}

impl FaultPlan {
    fn new(trigger: FaultTrigger) -> Self {
        FaultPlan {
            trigger,
            times: None,
            seen: 0,
            fired: 0,
        }
    }

    /// Fail the `n`th command (zero-based) executed after installation
    pub fn fail_nth(n: usize) -> Self {
        Self::new(FaultTrigger::Nth(n))
    }

    /// Fail every command touching `key`
    pub fn fail_on_key(key: impl Into<String>) -> Self {
        Self::new(FaultTrigger::Key(key.into()))
    }

    /// Fail every command named `name`
    pub fn fail_command(name: &'static str) -> Self {
        Self::new(FaultTrigger::Command(name))
    }

    /// Stop failing after `times` matches
    pub fn with_times(mut self, times: usize) -> Self {
        self.times = Some(times);
        self
    }

    /// Number of faults injected so far
    pub fn fired(&self) -> usize {
        self.fired
    }

    /// Observe a command; returns the error to raise when it should fail
    pub(crate) fn check(&mut self, command: &Command) -> Option<Error> {
        let position = self.seen;
        self.seen += 1;

        if self.times.map_or(false, |t| self.fired >= t) {
            return None;
        }

        let matched = match &self.trigger {
            FaultTrigger::Nth(n) => position == *n,
            FaultTrigger::Key(key) => command.keys().contains(&key.as_str()),
            FaultTrigger::Command(name) => command.name() == *name,
        };
        if !matched {
            return None;
        }

        self.fired += 1;
        Some(Error::backend(format!(
            "{} on {} (command #{})",
            INJECTED_FAULT,
            command.name(),
            position
        )))
    }
}
