use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::types::Result;

use super::{sort_entries, CachedOutcome, CachedPath, PathCache, SortBy};

#[derive(Default)]
struct Inner {
    entries: FxHashMap<(String, String), CachedPath>,
    tick: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Process-local cache; contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<Inner>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PathCache for MemoryCache {
    fn contains(&self, src: &str, dst: &str) -> Result<Option<CachedPath>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .get(&(src.to_string(), dst.to_string()))
            .cloned())
    }

    fn insert(&self, src: &str, dst: &str, depth: usize, outcome: &CachedOutcome) -> Result<()> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        inner
            .entries
            .entry((src.to_string(), dst.to_string()))
            .and_modify(|entry| {
                entry.outcome = outcome.clone();
                entry.depth = depth;
                entry.count += 1;
                entry.last_access = tick;
            })
            .or_insert_with(|| CachedPath {
                src: src.to_string(),
                dst: dst.to_string(),
                outcome: outcome.clone(),
                depth,
                count: 1,
                last_access: tick,
            });
        Ok(())
    }

    fn update(&self, src: &str, dst: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        if let Some(entry) = inner.entries.get_mut(&(src.to_string(), dst.to_string())) {
            entry.count += 1;
            entry.last_access = tick;
        }
        Ok(())
    }

    fn retrieve(&self, limit: usize, sort: SortBy) -> Result<Vec<CachedPath>> {
        let mut entries: Vec<CachedPath> = self.inner.lock().entries.values().cloned().collect();
        sort_entries(&mut entries, sort);
        entries.truncate(limit);
        Ok(entries)
    }
}
