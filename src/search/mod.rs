#![forbid(unsafe_code)]

//! Shortest-path search over a frozen index and the admission machinery around it.

mod bfs;
mod coalesce;
mod limiter;
mod outcome;
mod path;

pub use bfs::PathFinder;
pub use coalesce::Coalescer;
pub use limiter::AdmissionLimiter;
pub use outcome::{SearchOutcome, STATUS_FOUND, STATUS_IMPOSSIBLE};
pub use path::{Hop, Path};
