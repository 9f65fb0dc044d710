//! Command vocabulary understood by backends
//!
//! Values are opaque bytes; encoding is the client's concern. List positions
//! follow the usual convention: `0` is the head, `-1` the tail, negative
//! indexes count from the end.

use std::time::Duration;

/// Expiry applied when a scalar value is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Never expire
    #[default]
    Persistent,
    /// Expire after the given duration
    Expire(Duration),
}

impl Ttl {
    /// Duration until expiry, `None` when persistent
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Ttl::Persistent => None,
            Ttl::Expire(d) => Some(*d),
        }
    }
}

/// A single backend command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read a scalar value
    Get {
        /// Key to read
        key: String,
    },
    /// Write a scalar value, replacing whatever the key held
    Set {
        /// Key to write
        key: String,
        /// Encoded value
        value: Vec<u8>,
        /// Expiry of the written value
        ttl: Ttl,
    },
    /// Count how many of the keys exist
    Exists {
        /// Keys to probe
        keys: Vec<String>,
    },
    /// Remove keys; absent keys are ignored
    Del {
        /// Keys to remove
        keys: Vec<String>,
    },
    /// Append values to the tail of a list
    RPush {
        /// List key
        key: String,
        /// Encoded values, appended in order
        values: Vec<Vec<u8>>,
    },
    /// Prepend values to the head of a list
    LPush {
        /// List key
        key: String,
        /// Encoded values, each pushed to the head in order
        values: Vec<Vec<u8>>,
    },
    /// Remove and return the tail element
    RPop {
        /// List key
        key: String,
    },
    /// Remove and return the head element
    LPop {
        /// List key
        key: String,
    },
    /// Read the elements between two inclusive positions
    LRange {
        /// List key
        key: String,
        /// First position
        start: i64,
        /// Last position (inclusive)
        stop: i64,
    },
    /// Read one element by position
    LIndex {
        /// List key
        key: String,
        /// Position
        index: i64,
    },
    /// Remove up to `count` elements equal to `value`
    ///
    /// `count > 0` scans from the head, `count < 0` from the tail and
    /// `count == 0` removes every match.
    LRem {
        /// List key
        key: String,
        /// Maximum number of removals and scan direction
        count: i64,
        /// Encoded value to match
        value: Vec<u8>,
    },
}

impl Command {
    /// Command name, for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::Exists { .. } => "EXISTS",
            Command::Del { .. } => "DEL",
            Command::RPush { .. } => "RPUSH",
            Command::LPush { .. } => "LPUSH",
            Command::RPop { .. } => "RPOP",
            Command::LPop { .. } => "LPOP",
            Command::LRange { .. } => "LRANGE",
            Command::LIndex { .. } => "LINDEX",
            Command::LRem { .. } => "LREM",
        }
    }

    /// Keys the command reads or writes
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Command::Exists { keys } | Command::Del { keys } => {
                keys.iter().map(String::as_str).collect()
            }
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::RPush { key, .. }
            | Command::LPush { key, .. }
            | Command::RPop { key }
            | Command::LPop { key }
            | Command::LRange { key, .. }
            | Command::LIndex { key, .. }
            | Command::LRem { key, .. } => vec![key.as_str()],
        }
    }

    /// Whether the command can modify state
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Command::Get { .. }
                | Command::Exists { .. }
                | Command::LRange { .. }
                | Command::LIndex { .. }
        )
    }
}

/// Backend reply to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command succeeded without a payload
    Ok,
    /// Key or element absent
    Nil,
    /// Integer result (counts, lengths)
    Int(i64),
    /// One encoded value
    Bytes(Vec<u8>),
    /// Sequence of encoded values
    Array(Vec<Vec<u8>>),
}

impl Reply {
    /// Whether the reply is `Nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }
}
