use std::sync::atomic::Ordering;

use crate::types::SlotId;

use super::probe::ProbeSequence;
use super::record::Record;
use super::stats::{BuildMetrics, IndexStats};

/// Frozen title table.
///
/// Produced by [`IndexBuilder::freeze`](super::IndexBuilder::freeze). It holds no locks and
/// offers no way to mutate slots, so any number of threads may read it concurrently.
#[derive(Debug)]
pub struct Index {
    slots: Box<[Option<Box<Record>>]>,
    probe_limit: u32,
    stats: IndexStats,
}

impl Index {
    pub(crate) fn from_parts(
        slots: Box<[Option<Box<Record>>]>,
        probe_limit: u32,
        metrics: &BuildMetrics,
    ) -> Self {
        let mut stats = IndexStats {
            capacity: slots.len() as u64,
            max_probe: metrics.max_probe.load(Ordering::Relaxed),
            total_probes: metrics.probes.load(Ordering::Relaxed),
            restarts: metrics.restarts.load(Ordering::Relaxed),
            ..IndexStats::default()
        };
        for record in slots.iter().flatten() {
            stats.entries += 1;
            stats.total_links += record.out_degree() as u64;
            if record.is_stub() {
                stats.stubs += 1;
            }
        }
        Self {
            slots,
            probe_limit,
            stats,
        }
    }

    /// Looks up `title` without creating anything.
    ///
    /// Walks the same probe sequence the builder used; reaching an empty slot means the
    /// title was never inserted.
    pub fn find(&self, title: &str) -> Option<SlotId> {
        for slot in ProbeSequence::new(title, self.slots.len(), self.probe_limit) {
            match &self.slots[slot] {
                None => return None,
                Some(record) if record.title() == title => return Some(SlotId(slot as u32)),
                Some(_) => continue,
            }
        }
        None
    }

    /// Record stored at `slot`, if any.
    pub fn record(&self, slot: SlotId) -> Option<&Record> {
        self.slots.get(slot.index()).and_then(Option::as_deref)
    }

    /// Title stored at `slot`, if any.
    pub fn title(&self, slot: SlotId) -> Option<&str> {
        self.record(slot).map(Record::title)
    }

    /// Outbound links of `slot`; empty for stubs and empty slots.
    pub fn links(&self, slot: SlotId) -> &[SlotId] {
        self.record(slot).map(Record::links).unwrap_or(&[])
    }

    /// Whether `slot` holds a record.
    pub fn contains_slot(&self, slot: SlotId) -> bool {
        self.record(slot).is_some()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.stats.entries as usize
    }

    /// True when the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.stats.entries == 0
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Record)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.as_deref().map(|r| (SlotId(slot as u32), r)))
    }

    /// Build statistics and shape of the table.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}
