use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by build workers while they place titles.
///
/// All counters are atomics so workers can record without coordination.
#[derive(Debug, Default)]
pub(crate) struct BuildMetrics {
    /// Records created.
    pub created: AtomicU64,
    /// Slots examined across all successful resolutions.
    pub probes: AtomicU64,
    /// Longest probe sequence needed by any single resolution.
    pub max_probe: AtomicU64,
    /// Resolutions restarted because a slot was claimed under them.
    pub restarts: AtomicU64,
}

impl BuildMetrics {
    pub(crate) fn record_probe(&self, probes: u64) {
        self.probes.fetch_add(probes, Ordering::Relaxed);
        self.max_probe.fetch_max(probes, Ordering::Relaxed);
    }

    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shape of a frozen index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndexStats {
    /// Total slots, occupied or not.
    pub capacity: u64,
    /// Occupied slots.
    pub entries: u64,
    /// Records that were only ever link targets.
    pub stubs: u64,
    /// Sum of all link-list lengths.
    pub total_links: u64,
    /// Longest probe sequence seen during the build.
    pub max_probe: u64,
    /// Slots examined across every resolution during the build.
    pub total_probes: u64,
    /// Resolutions that had to start over after losing a slot race.
    pub restarts: u64,
}

impl IndexStats {
    /// Fraction of slots that are occupied.
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.entries as f64 / self.capacity as f64
        }
    }
}
