#![forbid(unsafe_code)]

//! Identifiers and error types shared by every layer of the crate.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Position of a record inside the index slot array.
///
/// Link lists, paths and cache rows all refer to pages through this index; it is a weak
/// reference into the owning [`Index`](crate::index::Index), never an owning pointer.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Returns the slot position as a `usize` suitable for indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(value: u32) -> Self {
        SlotId(value)
    }
}

impl From<SlotId> for u32 {
    fn from(value: SlotId) -> Self {
        value.0
    }
}

/// Errors raised while building the index or talking to the result cache.
#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    /// I/O failure while reading loader input.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Loader input did not follow the manifest/shard line format.
    #[error("parse error in {path}:{line}: {reason}")]
    Parse {
        /// File (or stream name) being parsed.
        path: PathBuf,
        /// One-based line number of the offending line.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
    /// The probe sequence ran out before finding a free or matching slot.
    ///
    /// This means the table was sized too small for its input. The build must be abandoned.
    #[error("index full: no slot for {title:?} after {probes} probes")]
    TableFull {
        /// Title that could not be placed.
        title: String,
        /// Number of slots examined.
        probes: u32,
    },
    /// Requested slot count does not fit in a [`SlotId`].
    #[error("index capacity {0} exceeds the addressable slot range")]
    Capacity(u64),
    /// Result cache backend failure.
    #[error("cache: {0}")]
    Cache(String),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LinkError>;

impl From<rusqlite::Error> for LinkError {
    fn from(err: rusqlite::Error) -> Self {
        LinkError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::Cache(err.to_string())
    }
}

/// Reasons a query could not be mapped onto two existing pages.
///
/// These are ordinary outcomes reported back to the caller before any search begins.
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum LookupError {
    /// Both titles were empty.
    #[error("Invalid source and destination")]
    EmptyBoth,
    /// Source title was empty.
    #[error("Invalid source")]
    EmptySource,
    /// Destination title was empty.
    #[error("Invalid destination")]
    EmptyDestination,
    /// Neither title is present in the index.
    #[error("Couldn't find either source or destination")]
    MissingBoth,
    /// Source title is not present in the index.
    #[error("Couldn't find source")]
    MissingSource,
    /// Destination title is not present in the index.
    #[error("Couldn't find destination")]
    MissingDestination,
}
