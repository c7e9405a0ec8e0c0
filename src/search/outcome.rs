use std::fmt;

use serde::{Deserialize, Serialize};

use super::path::Path;

/// Result of one shortest-path search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A shortest path; empty when source and destination are the same page.
    Found(Path),
    /// The explored component ran out of pages without reaching the destination.
    Impossible,
    /// The depth limit was reached before the destination was found.
    DepthExceeded(usize),
}

/// Legacy status code for [`SearchOutcome::Found`].
pub const STATUS_FOUND: i64 = 0;
/// Legacy status code for [`SearchOutcome::Impossible`].
pub const STATUS_IMPOSSIBLE: i64 = -2;

impl SearchOutcome {
    /// Integer status: `0` found, `-2` impossible, `n > 0` truncated at depth `n`.
    pub fn status_code(&self) -> i64 {
        match self {
            SearchOutcome::Found(_) => STATUS_FOUND,
            SearchOutcome::Impossible => STATUS_IMPOSSIBLE,
            SearchOutcome::DepthExceeded(depth) => *depth as i64,
        }
    }

    /// Rebuilds an outcome from a status code and stored path.
    ///
    /// The path is ignored for anything but success. Unknown codes yield `None`.
    pub fn from_status(code: i64, path: Path) -> Option<Self> {
        match code {
            STATUS_FOUND => Some(SearchOutcome::Found(path)),
            STATUS_IMPOSSIBLE => Some(SearchOutcome::Impossible),
            depth if depth > 0 => Some(SearchOutcome::DepthExceeded(depth as usize)),
            _ => None,
        }
    }

    /// The path, when one was found.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SearchOutcome::Found(path) => Some(path),
            _ => None,
        }
    }

    /// Whether a path was found.
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Found(path) if path.len() == 1 => write!(f, "found in 1 click"),
            SearchOutcome::Found(path) => write!(f, "found in {} clicks", path.len()),
            SearchOutcome::Impossible => write!(f, "no such path exists"),
            SearchOutcome::DepthExceeded(depth) => {
                write!(f, "no path found after {depth} iterations")
            }
        }
    }
}
