use rustc_hash::FxHashSet;
use tracing::trace;

use crate::index::Index;
use crate::types::SlotId;

use super::outcome::SearchOutcome;
use super::path::Path;

/// Depth-bounded breadth-first shortest-path search over a frozen [`Index`].
///
/// Levels are expanded strictly in order. The visited set spans all levels, so every page is
/// expanded at most once per search. The search stops as soon as any frontier entry links to
/// the destination; among several equally short paths, the first one met while scanning the
/// frontier in order (and each link list in order) wins.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    index: &'a Index,
    max_depth: usize,
}

impl<'a> PathFinder<'a> {
    /// Creates a finder that explores at most `max_depth` levels.
    ///
    /// A limit of zero is raised to one, so a truncated result always carries a positive depth.
    pub fn new(index: &'a Index, max_depth: usize) -> Self {
        Self {
            index,
            max_depth: max_depth.max(1),
        }
    }

    /// Depth limit used by [`search`](Self::search).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Finds a shortest path from `src` to `dst`.
    pub fn search(&self, src: SlotId, dst: SlotId) -> SearchOutcome {
        if src == dst {
            return SearchOutcome::Found(Path::new());
        }
        if self.index.links(src).is_empty() {
            return SearchOutcome::Impossible;
        }

        let mut visited = FxHashSet::default();
        visited.insert(src);
        let mut frontier = vec![Path::new()];
        let mut next = Vec::new();

        for level in 1..=self.max_depth {
            if frontier.is_empty() {
                trace!(level, visited = visited.len(), "bfs.exhausted");
                return SearchOutcome::Impossible;
            }
            for path in &frontier {
                let tail = path.last().unwrap_or(src);
                for &link in self.index.links(tail) {
                    if link == dst {
                        trace!(level, visited = visited.len(), "bfs.found");
                        return SearchOutcome::Found(path.extended(link));
                    }
                    if visited.insert(link) {
                        next.push(path.extended(link));
                    }
                }
            }
            std::mem::swap(&mut frontier, &mut next);
            next.clear();
        }
        trace!(visited = visited.len(), "bfs.depth_exceeded");
        SearchOutcome::DepthExceeded(self.max_depth)
    }
}
