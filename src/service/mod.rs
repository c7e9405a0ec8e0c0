#![forbid(unsafe_code)]

//! Query front end over a frozen index.
//!
//! [`Navigator`] turns a pair of titles into a search result: it validates and resolves the
//! titles, consults the optional result cache, and otherwise runs the search through the
//! admission limiter (and the coalescer, when enabled).

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CachedOutcome, CachedPath, PathCache, SortBy};
use crate::config::SearchOptions;
use crate::index::Index;
use crate::search::{AdmissionLimiter, Coalescer, Hop, Path, PathFinder, SearchOutcome};
use crate::types::{LookupError, Result, SlotId};

/// Result of one answered query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    /// Resolved source slot.
    pub src: SlotId,
    /// Resolved destination slot.
    pub dst: SlotId,
    /// Search result.
    pub outcome: SearchOutcome,
    /// True when the outcome came from the cache.
    pub cached: bool,
}

/// Shared entry point for path queries; safe to use from many threads at once.
pub struct Navigator {
    index: Arc<Index>,
    options: SearchOptions,
    limiter: AdmissionLimiter,
    coalescer: Option<Coalescer<(SlotId, SlotId), SearchOutcome>>,
    cache: Option<Arc<dyn PathCache>>,
}

impl Navigator {
    /// Creates a navigator with no cache attached.
    pub fn new(index: Arc<Index>, options: SearchOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            limiter: AdmissionLimiter::new(options.permits),
            coalescer: options.coalesce.then(Coalescer::new),
            index,
            options,
            cache: None,
        })
    }

    /// Attaches a result cache.
    pub fn with_cache(mut self, cache: Arc<dyn PathCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The index queries run against.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Active search options.
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Admission limiter, exposed for its counters.
    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Maps both titles to slots without creating anything.
    pub fn lookup(&self, src: &str, dst: &str) -> std::result::Result<(SlotId, SlotId), LookupError> {
        match (src.is_empty(), dst.is_empty()) {
            (true, true) => return Err(LookupError::EmptyBoth),
            (true, false) => return Err(LookupError::EmptySource),
            (false, true) => return Err(LookupError::EmptyDestination),
            (false, false) => {}
        }
        match (self.index.find(src), self.index.find(dst)) {
            (Some(src), Some(dst)) => Ok((src, dst)),
            (None, None) => Err(LookupError::MissingBoth),
            (None, Some(_)) => Err(LookupError::MissingSource),
            (Some(_), None) => Err(LookupError::MissingDestination),
        }
    }

    /// Runs an admitted search between two resolved slots, bypassing the cache.
    pub fn search(&self, src: SlotId, dst: SlotId) -> SearchOutcome {
        let run = || {
            self.limiter.run(src, dst, || {
                PathFinder::new(&self.index, self.options.max_depth).search(src, dst)
            })
        };
        match &self.coalescer {
            Some(coalescer) => coalescer.run((src, dst), run),
            None => run(),
        }
    }

    /// Answers a query by title.
    ///
    /// A cached entry is used only when it answers a search bounded by this navigator's depth
    /// limit and its stored path still resolves and links up in the current index; anything
    /// else is searched again and the entry replaced. Cache failures are logged and otherwise
    /// ignored; the search result is still returned.
    pub fn query(&self, src: &str, dst: &str) -> std::result::Result<QueryReport, LookupError> {
        let (src_slot, dst_slot) = self.lookup(src, dst)?;

        if let Some(cache) = &self.cache {
            match cache.contains(src, dst) {
                Ok(Some(hit)) => match self.restore(src_slot, dst_slot, &hit) {
                    Some(outcome) => {
                        debug!(src, dst, "navigator.cache_hit");
                        if let Err(err) = cache.update(src, dst) {
                            warn!(src, dst, error = %err, "navigator.cache_update_failed");
                        }
                        return Ok(QueryReport {
                            src: src_slot,
                            dst: dst_slot,
                            outcome,
                            cached: true,
                        });
                    }
                    None => debug!(src, dst, depth = hit.depth, "navigator.cache_stale"),
                },
                Ok(None) => debug!(src, dst, "navigator.cache_miss"),
                Err(err) => warn!(src, dst, error = %err, "navigator.cache_read_failed"),
            }
        }

        let outcome = self.search(src_slot, dst_slot);
        if let Some(cache) = &self.cache {
            match self.stored(&outcome) {
                Some(stored) => {
                    if let Err(err) = cache.insert(src, dst, self.options.max_depth, &stored) {
                        warn!(src, dst, error = %err, "navigator.cache_insert_failed");
                    }
                }
                None => warn!(src, dst, "navigator.cache_untitled_path"),
            }
        }
        Ok(QueryReport {
            src: src_slot,
            dst: dst_slot,
            outcome,
            cached: false,
        })
    }

    /// Converts a cached entry into the answer a fresh search would give, if it can.
    fn restore(&self, src: SlotId, dst: SlotId, hit: &CachedPath) -> Option<SearchOutcome> {
        let max_depth = self.options.max_depth;
        match &hit.outcome {
            CachedOutcome::Found(titles) => {
                let nodes = titles
                    .iter()
                    .map(|title| self.index.find(title))
                    .collect::<Option<Vec<_>>>()?;
                let mut tail = src;
                for &node in &nodes {
                    if !self.index.links(tail).contains(&node) {
                        return None;
                    }
                    tail = node;
                }
                if tail != dst {
                    return None;
                }
                if nodes.len() > max_depth {
                    return Some(SearchOutcome::DepthExceeded(max_depth));
                }
                Some(SearchOutcome::Found(Path::from(nodes)))
            }
            CachedOutcome::Impossible if hit.depth <= max_depth => Some(SearchOutcome::Impossible),
            CachedOutcome::DepthExceeded(depth) if *depth >= max_depth => {
                Some(SearchOutcome::DepthExceeded(max_depth))
            }
            _ => None,
        }
    }

    fn stored(&self, outcome: &SearchOutcome) -> Option<CachedOutcome> {
        Some(match outcome {
            SearchOutcome::Found(path) => CachedOutcome::Found(
                path.as_slice()
                    .iter()
                    .map(|&slot| self.index.title(slot).map(str::to_owned))
                    .collect::<Option<_>>()?,
            ),
            SearchOutcome::Impossible => CachedOutcome::Impossible,
            SearchOutcome::DepthExceeded(depth) => CachedOutcome::DepthExceeded(*depth),
        })
    }

    /// Pairs every node of `path` with its title.
    pub fn render<'a>(&'a self, path: &Path) -> Vec<Hop<'a>> {
        path.hops(&self.index)
    }

    /// Most requested cached queries; empty without a cache.
    pub fn popular(&self, limit: usize) -> Result<Vec<CachedPath>> {
        self.history(limit, SortBy::Popular)
    }

    /// Most recently requested cached queries; empty without a cache.
    pub fn recent(&self, limit: usize) -> Result<Vec<CachedPath>> {
        self.history(limit, SortBy::Recent)
    }

    fn history(&self, limit: usize, sort: SortBy) -> Result<Vec<CachedPath>> {
        match &self.cache {
            Some(cache) => cache.retrieve(limit, sort),
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("entries", &self.index.len())
            .field("options", &self.options)
            .field("limiter", &self.limiter)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
