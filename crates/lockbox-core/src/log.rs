//! Ordered logs: entries, cursors, and the paths that name them.
//!
//! Every protected resource is a log rooted at a path:
//!
//! | Resource              | Path                      |
//! |-----------------------|---------------------------|
//! | Vault of `K`          | `K`                       |
//! | Messages of channel C | `channel/C/msgs`          |
//! | Channels of user `K`  | `user/K/channels`         |
//!
//! Indices start at 1, increase strictly per path, and are never reused.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::KeyId;

/// Position of an entry in its log.
pub type Index = i64;

/// Read direction for a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Direction::Ascending),
            "desc" => Ok(Direction::Descending),
            other => Err(CoreError::InvalidDirection(other.to_string())),
        }
    }
}

/// One record in an ordered log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub index: Index,
    /// Milliseconds since epoch, assigned by the store.
    pub timestamp: i64,
    pub data: Bytes,
}

/// Client-supplied pagination position.
///
/// `index` means "strictly after" when ascending and "strictly before" when
/// descending. `None` (or 0) starts from the beginning or the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub index: Option<Index>,
    pub limit: Option<usize>,
    pub direction: Direction,
}

impl Cursor {
    /// Cursor starting after `index`, ascending.
    pub fn after(index: Index) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    /// The index to resume from, with 0 treated as absent.
    pub fn start(&self) -> Option<Index> {
        self.index.filter(|i| *i > 0)
    }

    /// Page size after applying the server-side cap.
    ///
    /// Zero, absent, or anything above `max` becomes `max`.
    pub fn effective_limit(&self, max: usize) -> usize {
        match self.limit {
            Some(n) if n > 0 && n <= max => n,
            _ => max,
        }
    }
}

/// Log path of a vault.
pub fn vault_path(owner: &KeyId) -> String {
    owner.to_string()
}

/// Log path of a channel's messages.
pub fn channel_messages_path(channel: &KeyId) -> String {
    format!("channel/{}/msgs", channel)
}

/// Log path of a user's channel index.
pub fn user_channels_path(user: &KeyId) -> String {
    format!("user/{}/channels", user)
}
