#![forbid(unsafe_code)]

//! Open-addressing title table.
//!
//! The table is built once by many workers through [`IndexBuilder`] and then frozen into an
//! [`Index`] that is read-only for the rest of the process. Slot positions never change, so a
//! [`SlotId`](crate::types::SlotId) handed out during the build stays valid in the frozen
//! index.

mod builder;
mod probe;
mod record;
mod stats;
mod table;

/// Concurrent build-phase table.
pub use builder::IndexBuilder;

/// Page title plus outbound links.
pub use record::Record;

/// Summary counters of a frozen index.
pub use stats::IndexStats;

/// Frozen, lock-free title table.
pub use table::Index;
