use serde::{Deserialize, Serialize};

use crate::index::Index;
use crate::types::SlotId;

/// Trail of pages visited after the (implicit) source, ending at the destination.
///
/// Extending a path copies it; a path that has been handed to a frontier entry is never
/// changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    nodes: Vec<SlotId>,
}

/// One step of a rendered path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hop<'a> {
    /// Slot of the page.
    pub slot: SlotId,
    /// Display title; `None` if the slot is empty in the index it was rendered against.
    pub title: Option<&'a str>,
}

impl Path {
    /// The empty path, i.e. the source itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// New path holding this one followed by `next`.
    pub fn extended(&self, next: SlotId) -> Path {
        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.extend_from_slice(&self.nodes);
        nodes.push(next);
        Path { nodes }
    }

    /// Number of clicks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for the zero-click path.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Final page, or `None` for the empty path.
    pub fn last(&self) -> Option<SlotId> {
        self.nodes.last().copied()
    }

    /// Pages in visiting order.
    pub fn as_slice(&self) -> &[SlotId] {
        &self.nodes
    }

    /// Iterates over pages in visiting order.
    pub fn iter(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.nodes.iter().copied()
    }

    /// Consumes the path, returning its pages.
    pub fn into_vec(self) -> Vec<SlotId> {
        self.nodes
    }

    /// Pairs each step with its title for display.
    pub fn hops<'a>(&self, index: &'a Index) -> Vec<Hop<'a>> {
        self.nodes
            .iter()
            .map(|&slot| Hop {
                slot,
                title: index.title(slot),
            })
            .collect()
    }
}

impl From<Vec<SlotId>> for Path {
    fn from(nodes: Vec<SlotId>) -> Self {
        Path { nodes }
    }
}

impl FromIterator<SlotId> for Path {
    fn from_iter<I: IntoIterator<Item = SlotId>>(iter: I) -> Self {
        Path {
            nodes: iter.into_iter().collect(),
        }
    }
}
