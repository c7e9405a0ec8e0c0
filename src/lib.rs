//! Link-graph index and shortest-click search for wiki dumps.
//!
//! The graph is loaded once from sharded page files into an [`Index`] and then answers
//! "how many clicks from A to B" queries through a [`Navigator`] from any number of threads.

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod index;
pub mod loader;
pub mod logging;
pub mod search;
pub mod service;
pub mod types;

pub use config::{Config, IndexOptions, SearchOptions};
pub use index::{Index, IndexBuilder};
pub use search::{Path, PathFinder, SearchOutcome};
pub use service::{Navigator, QueryReport};
pub use types::{LinkError, LookupError, Result, SlotId};
