use crate::types::SlotId;

/// A page title together with its outbound links, in the order the source listed them.
///
/// Link targets may repeat. A record whose page block was never seen (it was only ever
/// linked to) is a stub and has no links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    title: Box<str>,
    links: Vec<SlotId>,
    page: bool,
}

impl Record {
    pub(crate) fn new(title: Box<str>, links: Vec<SlotId>, page: bool) -> Self {
        Self { title, links, page }
    }

    /// Title this record is keyed by.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Outbound links as slot indices.
    pub fn links(&self) -> &[SlotId] {
        &self.links
    }

    /// Number of outbound links, duplicates included.
    pub fn out_degree(&self) -> usize {
        self.links.len()
    }

    /// True when the record was created only as a link target.
    pub fn is_stub(&self) -> bool {
        !self.page
    }
}
