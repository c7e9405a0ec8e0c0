#![forbid(unsafe_code)]

//! Store of previously answered queries.
//!
//! Entries are keyed by the source and destination titles as the caller typed them. Each
//! entry remembers how often it was requested and when it was last touched, which is what
//! the popular/recent listings sort on. Access order is tracked with a per-cache sequence
//! number rather than wall-clock time so that ordering is exact.
//!
//! Paths are stored as page titles, never as slots: slot numbers depend on the order in
//! which colliding titles were claimed and differ between builds of the same input.

mod memory;
mod sqlite;

use serde::{Deserialize, Serialize};

use crate::search::{STATUS_FOUND, STATUS_IMPOSSIBLE};
use crate::types::Result;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Search result in its stored form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CachedOutcome {
    /// Titles of the pages clicked through, destination last.
    Found(Vec<String>),
    /// No path exists within the explored component.
    Impossible,
    /// The search stopped at this depth without reaching the destination.
    DepthExceeded(usize),
}

impl CachedOutcome {
    /// Integer status in the same encoding as [`SearchOutcome::status_code`].
    ///
    /// [`SearchOutcome::status_code`]: crate::search::SearchOutcome::status_code
    pub fn status_code(&self) -> i64 {
        match self {
            CachedOutcome::Found(_) => STATUS_FOUND,
            CachedOutcome::Impossible => STATUS_IMPOSSIBLE,
            CachedOutcome::DepthExceeded(depth) => *depth as i64,
        }
    }

    /// Rebuilds an outcome from a status code and stored titles; unknown codes yield `None`.
    pub fn from_status(code: i64, titles: Vec<String>) -> Option<Self> {
        match code {
            STATUS_FOUND => Some(CachedOutcome::Found(titles)),
            STATUS_IMPOSSIBLE => Some(CachedOutcome::Impossible),
            depth if depth > 0 => Some(CachedOutcome::DepthExceeded(depth as usize)),
            _ => None,
        }
    }

    /// Titles of a found path.
    pub fn titles(&self) -> Option<&[String]> {
        match self {
            CachedOutcome::Found(titles) => Some(titles),
            _ => None,
        }
    }
}

/// One cached query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedPath {
    /// Source title.
    pub src: String,
    /// Destination title.
    pub dst: String,
    /// Stored search result.
    pub outcome: CachedOutcome,
    /// Depth limit the stored result was computed under.
    pub depth: usize,
    /// Number of times the query was requested.
    pub count: u64,
    /// Access sequence number of the most recent request; larger is more recent.
    pub last_access: u64,
}

/// Ordering for [`PathCache::retrieve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Most requested first; ties broken by recency.
    #[default]
    Popular,
    /// Most recently requested first.
    Recent,
}

/// Insert/lookup/update contract the query layer relies on.
pub trait PathCache: Send + Sync {
    /// Returns the entry for `(src, dst)` without touching its metadata.
    fn contains(&self, src: &str, dst: &str) -> Result<Option<CachedPath>>;

    /// Stores `outcome`, computed with depth limit `depth`, for `(src, dst)`, replacing any
    /// previous result and counting as one more request.
    fn insert(&self, src: &str, dst: &str, depth: usize, outcome: &CachedOutcome) -> Result<()>;

    /// Records another request for `(src, dst)`. Missing entries are ignored.
    fn update(&self, src: &str, dst: &str) -> Result<()>;

    /// Lists up to `limit` entries in the requested order.
    fn retrieve(&self, limit: usize, sort: SortBy) -> Result<Vec<CachedPath>>;
}

fn sort_entries(entries: &mut [CachedPath], sort: SortBy) {
    match sort {
        SortBy::Popular => entries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_access.cmp(&a.last_access))
        }),
        SortBy::Recent => entries.sort_by(|a, b| b.last_access.cmp(&a.last_access)),
    }
}
