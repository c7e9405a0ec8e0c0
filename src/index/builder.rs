use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::IndexOptions;
use crate::types::{LinkError, Result, SlotId};

use super::probe::ProbeSequence;
use super::record::Record;
use super::stats::BuildMetrics;
use super::table::Index;

/// Record under construction.
///
/// Only the worker that owns the page block appends to `links`, so the mutex is never
/// contended; it exists to make those appends safe alongside readers of `title`.
struct PendingRecord {
    title: Box<str>,
    page: AtomicBool,
    links: Mutex<Vec<SlotId>>,
}

impl PendingRecord {
    fn new(title: &str, size_hint: Option<usize>) -> Self {
        Self {
            title: title.into(),
            page: AtomicBool::new(size_hint.is_some()),
            links: Mutex::new(Vec::with_capacity(size_hint.unwrap_or(0))),
        }
    }

    fn mark_page(&self, size_hint: usize) {
        self.page.store(true, Ordering::Release);
        let mut links = self.links.lock();
        if links.capacity() < size_hint {
            let additional = size_hint - links.len();
            links.reserve_exact(additional);
        }
    }

    fn into_record(self) -> Record {
        Record::new(
            self.title,
            self.links.into_inner(),
            self.page.into_inner(),
        )
    }
}

/// Fixed-capacity title table populated concurrently by build workers.
///
/// Every method takes `&self`; share the builder across scoped threads, then call
/// [`freeze`](Self::freeze) to obtain the read-only [`Index`].
///
/// Empty slots are claimed under one of a small set of stripe locks (`slot mod stripes`).
/// A worker that finds a slot empty takes its stripe, checks again, and either creates the
/// record or starts the whole resolution over, since the table changed under it.
pub struct IndexBuilder {
    slots: Box<[OnceLock<Box<PendingRecord>>]>,
    stripes: Box<[Mutex<()>]>,
    probe_limit: u32,
    metrics: BuildMetrics,
}

impl IndexBuilder {
    /// Allocates a table sized for `expected` titles according to `options`.
    pub fn new(expected: u64, options: &IndexOptions) -> Result<Self> {
        options.validate()?;
        Self::with_capacity(options.capacity_for(expected), options)
    }

    /// Allocates a table with exactly `capacity` slots.
    pub fn with_capacity(capacity: u64, options: &IndexOptions) -> Result<Self> {
        options.validate()?;
        if capacity == 0 || capacity > u64::from(u32::MAX) {
            return Err(LinkError::Capacity(capacity));
        }
        let slots = (0..capacity).map(|_| OnceLock::new()).collect();
        let stripes = (0..options.stripe_count).map(|_| Mutex::new(())).collect();
        debug!(capacity, stripes = options.stripe_count, "index.alloc");
        Ok(Self {
            slots,
            stripes,
            probe_limit: options.probe_limit,
            metrics: BuildMetrics::default(),
        })
    }

    /// Number of slots in the table.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of records created so far.
    pub fn len(&self) -> usize {
        self.metrics.created.load(Ordering::Relaxed) as usize
    }

    /// True when no record has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the slot holding `title`, creating the record if it does not exist yet.
    ///
    /// `size_hint` is `Some(out_degree)` when resolving a page from its own block: the
    /// record is marked as a page and its link list is pre-sized to at least that many
    /// entries. `None` resolves a link target, creating an empty stub when needed.
    ///
    /// Fails with [`LinkError::TableFull`] when the probe limit is exhausted, which means
    /// the table is undersized for its input and the build cannot continue.
    pub fn resolve(&self, title: &str, size_hint: Option<usize>) -> Result<SlotId> {
        'restart: loop {
            let probes = ProbeSequence::new(title, self.slots.len(), self.probe_limit);
            for (attempt, slot) in probes.enumerate() {
                let cell = &self.slots[slot];
                match cell.get() {
                    Some(record) if &*record.title == title => {
                        if let Some(hint) = size_hint {
                            let _stripe = self.stripe(slot).lock();
                            record.mark_page(hint);
                        }
                        self.finish_probe(title, attempt);
                        return Ok(SlotId(slot as u32));
                    }
                    Some(_) => continue,
                    None => {
                        let stripe = self.stripe(slot).lock();
                        if cell.get().is_none()
                            && cell
                                .set(Box::new(PendingRecord::new(title, size_hint)))
                                .is_ok()
                        {
                            drop(stripe);
                            self.metrics.record_created();
                            self.finish_probe(title, attempt);
                            return Ok(SlotId(slot as u32));
                        }
                        drop(stripe);
                        self.metrics.record_restart();
                        continue 'restart;
                    }
                }
            }
            return Err(LinkError::TableFull {
                title: title.to_string(),
                probes: self.probe_limit,
            });
        }
    }

    /// Appends `targets` to the link list of the page at `owner`.
    ///
    /// Callers must own the page block for `owner`; the index never merges link lists
    /// written by different workers for the same page.
    pub fn extend_links(&self, owner: SlotId, targets: &[SlotId]) -> Result<()> {
        let record = self
            .slots
            .get(owner.index())
            .and_then(OnceLock::get)
            .ok_or_else(|| LinkError::Config(format!("slot {owner} holds no record")))?;
        record.links.lock().extend_from_slice(targets);
        Ok(())
    }

    /// Resolves a page and all of its link targets, then records the links.
    pub fn add_page<S: AsRef<str>>(&self, title: &str, links: &[S]) -> Result<SlotId> {
        let owner = self.resolve(title, Some(links.len()))?;
        let mut targets = Vec::with_capacity(links.len());
        for link in links {
            targets.push(self.resolve(link.as_ref(), None)?);
        }
        self.extend_links(owner, &targets)?;
        Ok(owner)
    }

    /// Ends the build phase and returns the immutable index.
    pub fn freeze(self) -> Index {
        let IndexBuilder {
            slots,
            probe_limit,
            metrics,
            ..
        } = self;
        let slots = slots
            .into_vec()
            .into_iter()
            .map(|cell| cell.into_inner().map(|pending| Box::new(pending.into_record())))
            .collect();
        Index::from_parts(slots, probe_limit, &metrics)
    }

    fn stripe(&self, slot: usize) -> &Mutex<()> {
        &self.stripes[slot % self.stripes.len()]
    }

    fn finish_probe(&self, title: &str, attempt: usize) {
        let probes = attempt as u64 + 1;
        self.metrics.record_probe(probes);
        if probes * 2 > u64::from(self.probe_limit) {
            warn!(title, probes, limit = self.probe_limit, "index.long_probe");
        }
    }
}
