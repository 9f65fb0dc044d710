//! MemoryBackend: in-process key-value engine
//!
//! This module implements the Backend trait using:
//! - `HashMap<String, Entry>` holding scalar values and lists
//! - `parking_lot::RwLock` for thread-safe access
//! - Logical TTL expiration: expired entries are invisible to reads and are
//!   dropped when next written or by [`MemoryBackend::purge_expired`]
//!
//! # Atomic groups
//!
//! Commands are evaluated against a staging overlay that reads through to
//! the committed map. Only when every command of a group succeeds is the
//! overlay merged back, under the same write lock. A failure anywhere leaves
//! the committed map untouched.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use linkstore_core::{Context, Error, Result};

use crate::backend::Backend;
use crate::command::{Command, Reply, Ttl};
use crate::testing::FaultPlan;

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stored {
    Scalar(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Entry {
    fn scalar(value: Vec<u8>, ttl: Ttl, now: Instant) -> Self {
        Entry {
            value: Stored::Scalar(value),
            expires_at: ttl.duration().and_then(|d| now.checked_add(d)),
        }
    }

    fn list() -> Self {
        Entry {
            value: Stored::List(VecDeque::new()),
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

fn wrong_type() -> Error {
    Error::backend(WRONG_TYPE)
}

/// Resolve a possibly negative list position against `len`
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { index + len } else { index };
    if (0..len).contains(&idx) {
        Some(idx as usize)
    } else {
        None
    }
}

/// Overlay of pending changes on top of the committed map
struct Staged<'a> {
    base: &'a HashMap<String, Entry>,
    now: Instant,
    changes: HashMap<String, Option<Entry>>,
}

impl<'a> Staged<'a> {
    fn new(base: &'a HashMap<String, Entry>, now: Instant) -> Self {
        Self {
            base,
            now,
            changes: HashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<&Entry> {
        match self.changes.get(key) {
            Some(change) => change.as_ref(),
            None => self.base.get(key).filter(|e| !e.is_expired(self.now)),
        }
    }

    fn slot(&mut self, key: &str) -> &mut Option<Entry> {
        let base = self.base;
        let now = self.now;
        self.changes
            .entry(key.to_string())
            .or_insert_with(|| base.get(key).filter(|e| !e.is_expired(now)).cloned())
    }

    fn list_mut(&mut self, key: &str, create: bool) -> Result<Option<&mut VecDeque<Vec<u8>>>> {
        let slot = self.slot(key);
        if slot.is_none() {
            if !create {
                return Ok(None);
            }
            *slot = Some(Entry::list());
        }
        match slot.as_mut().map(|e| &mut e.value) {
            Some(Stored::List(list)) => Ok(Some(list)),
            Some(Stored::Scalar(_)) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    fn list(&self, key: &str) -> Result<Option<&VecDeque<Vec<u8>>>> {
        match self.get(key).map(|e| &e.value) {
            Some(Stored::List(list)) => Ok(Some(list)),
            Some(Stored::Scalar(_)) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    /// Drop the list at `key` once it has no elements left
    fn prune_if_empty(&mut self, key: &str) {
        let slot = self.slot(key);
        if let Some(Entry {
            value: Stored::List(list),
            ..
        }) = slot
        {
            if list.is_empty() {
                *slot = None;
            }
        }
    }

    fn apply(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Get { key } => match self.get(&key).map(|e| &e.value) {
                None => Ok(Reply::Nil),
                Some(Stored::Scalar(bytes)) => Ok(Reply::Bytes(bytes.clone())),
                Some(Stored::List(_)) => Err(wrong_type()),
            },
            Command::Set { key, value, ttl } => {
                let now = self.now;
                *self.slot(&key) = Some(Entry::scalar(value, ttl, now));
                Ok(Reply::Ok)
            }
            Command::Exists { keys } => {
                let count = keys.iter().filter(|k| self.get(k).is_some()).count();
                Ok(Reply::Int(count as i64))
            }
            Command::Del { keys } => {
                let mut removed = 0;
                for key in &keys {
                    if self.get(key).is_some() {
                        *self.slot(key) = None;
                        removed += 1;
                    }
                }
                Ok(Reply::Int(removed))
            }
            Command::RPush { key, values } | Command::LPush { key, values }
                if values.is_empty() =>
            {
                Err(Error::backend(format!(
                    "wrong number of arguments for push on '{}'",
                    key
                )))
            }
            Command::RPush { key, values } => {
                let list = self.list_mut(&key, true)?.ok_or_else(wrong_type)?;
                list.extend(values);
                Ok(Reply::Int(list.len() as i64))
            }
            Command::LPush { key, values } => {
                let list = self.list_mut(&key, true)?.ok_or_else(wrong_type)?;
                for value in values {
                    list.push_front(value);
                }
                Ok(Reply::Int(list.len() as i64))
            }
            Command::RPop { key } => {
                let popped = match self.list_mut(&key, false)? {
                    Some(list) => list.pop_back(),
                    None => None,
                };
                self.prune_if_empty(&key);
                Ok(popped.map_or(Reply::Nil, Reply::Bytes))
            }
            Command::LPop { key } => {
                let popped = match self.list_mut(&key, false)? {
                    Some(list) => list.pop_front(),
                    None => None,
                };
                self.prune_if_empty(&key);
                Ok(popped.map_or(Reply::Nil, Reply::Bytes))
            }
            Command::LRange { key, start, stop } => {
                let Some(list) = self.list(&key)? else {
                    return Ok(Reply::Array(Vec::new()));
                };
                let len = list.len() as i64;
                let start = if start < 0 { (start + len).max(0) } else { start };
                let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
                if len == 0 || start > stop || start >= len {
                    return Ok(Reply::Array(Vec::new()));
                }
                let items = list
                    .iter()
                    .skip(start as usize)
                    .take((stop - start + 1) as usize)
                    .cloned()
                    .collect();
                Ok(Reply::Array(items))
            }
            Command::LIndex { key, index } => {
                let Some(list) = self.list(&key)? else {
                    return Ok(Reply::Nil);
                };
                Ok(resolve_index(index, list.len())
                    .and_then(|i| list.get(i).cloned())
                    .map_or(Reply::Nil, Reply::Bytes))
            }
            Command::LRem { key, count, value } => {
                let removed = match self.list_mut(&key, false)? {
                    Some(list) => remove_matching(list, count, &value),
                    None => 0,
                };
                self.prune_if_empty(&key);
                Ok(Reply::Int(removed as i64))
            }
        }
    }

    fn into_changes(self) -> HashMap<String, Option<Entry>> {
        self.changes
    }
}

fn remove_matching(list: &mut VecDeque<Vec<u8>>, count: i64, value: &[u8]) -> usize {
    let limit = if count == 0 {
        usize::MAX
    } else {
        count.unsigned_abs() as usize
    };
    let positions: Vec<usize> = if count < 0 {
        (0..list.len())
            .rev()
            .filter(|&i| list[i] == value)
            .take(limit)
            .collect()
    } else {
        (0..list.len())
            .filter(|&i| list[i] == value)
            .take(limit)
            .collect()
    };
    let mut sorted = positions;
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    for i in &sorted {
        list.remove(*i);
    }
    sorted.len()
}

/// In-process backend
///
/// Thread-safe through `parking_lot::RwLock`. Read-only commands take the
/// read lock; anything that may write takes the write lock for the whole
/// group, which also serializes atomic groups against each other.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Entry>>,
    faults: Mutex<Option<FaultPlan>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fault plan; replaces any previous plan
    pub fn inject_fault(&self, plan: FaultPlan) {
        *self.faults.lock() = Some(plan);
    }

    /// Remove the installed fault plan
    pub fn clear_faults(&self) {
        *self.faults.lock() = None;
    }

    /// Number of live (unexpired) keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether no live keys are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, e| !e.is_expired(now));
        before - data.len()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::backend("backend is closed"));
        }
        Ok(())
    }

    fn check_fault(&self, command: &Command) -> Result<()> {
        let mut faults = self.faults.lock();
        if let Some(plan) = faults.as_mut() {
            if let Some(err) = plan.check(command) {
                tracing::debug!(command = command.name(), "injected fault");
                return Err(err);
            }
        }
        Ok(())
    }

    fn run(&self, ctx: &Context, commands: Vec<Command>) -> Result<Vec<Reply>> {
        ctx.check()?;
        self.ensure_open()?;
        let now = Instant::now();
        let mut replies = Vec::with_capacity(commands.len());

        if commands.iter().all(|c| !c.is_write()) {
            let data = self.data.read();
            let mut staged = Staged::new(&data, now);
            for command in commands {
                self.check_fault(&command)?;
                replies.push(staged.apply(command)?);
            }
            return Ok(replies);
        }

        let mut data = self.data.write();
        let changes = {
            let mut staged = Staged::new(&data, now);
            for command in commands {
                self.check_fault(&command)?;
                replies.push(staged.apply(command)?);
            }
            staged.into_changes()
        };
        for (key, change) in changes {
            match change {
                Some(entry) => {
                    data.insert(key, entry);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(replies)
    }
}

impl Backend for MemoryBackend {
    fn ping(&self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        self.ensure_open()
    }

    fn execute(&self, ctx: &Context, command: Command) -> Result<Reply> {
        let mut replies = self.run(ctx, vec![command])?;
        replies
            .pop()
            .ok_or_else(|| Error::backend("command produced no reply"))
    }

    fn execute_atomic(&self, ctx: &Context, commands: Vec<Command>) -> Result<Vec<Reply>> {
        let count = commands.len();
        let replies = self.run(ctx, commands)?;
        tracing::trace!(commands = count, "applied atomic group");
        Ok(replies)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
