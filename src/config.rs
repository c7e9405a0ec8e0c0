//! Tunables for index construction and query admission.

use serde::{Deserialize, Serialize};

use crate::types::{LinkError, Result};

/// Sizing and locking parameters for the build phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Slots allocated per declared article.
    pub over_provision: u64,
    /// Extra slots added on top of the proportional allocation.
    pub headroom: u64,
    /// Number of stripe locks guarding slot creation.
    pub stripe_count: usize,
    /// Maximum number of slots examined for one title before giving up.
    pub probe_limit: u32,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            over_provision: 20,
            headroom: 1000,
            stripe_count: 50,
            probe_limit: 100,
        }
    }
}

impl IndexOptions {
    /// Slot count for an index expected to hold `expected` titles.
    pub fn capacity_for(&self, expected: u64) -> u64 {
        self.over_provision
            .saturating_mul(expected)
            .saturating_add(self.headroom)
    }

    /// Rejects values that would make the index unusable.
    pub fn validate(&self) -> Result<()> {
        if self.stripe_count == 0 {
            return Err(LinkError::Config("stripe_count must be at least 1".into()));
        }
        if self.probe_limit == 0 {
            return Err(LinkError::Config("probe_limit must be at least 1".into()));
        }
        if self.over_provision == 0 && self.headroom == 0 {
            return Err(LinkError::Config(
                "over_provision and headroom cannot both be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Query-time limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Number of BFS levels explored before a search is reported as truncated.
    pub max_depth: usize,
    /// Number of searches allowed to run at the same time.
    pub permits: usize,
    /// Whether concurrent identical requests share one computation.
    pub coalesce: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            permits: 2,
            coalesce: false,
        }
    }
}

impl SearchOptions {
    /// Rejects values that would make searches impossible to admit.
    pub fn validate(&self) -> Result<()> {
        if self.permits == 0 {
            return Err(LinkError::Config("permits must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(LinkError::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build-phase parameters.
    pub index: IndexOptions,
    /// Query-phase parameters.
    pub search: SearchOptions,
}

impl Config {
    /// Lower memory footprint at the cost of longer probe sequences.
    pub fn compact() -> Self {
        Self {
            index: IndexOptions {
                over_provision: 4,
                headroom: 1000,
                stripe_count: 50,
                probe_limit: 100,
            },
            search: SearchOptions::default(),
        }
    }

    /// Settings for a long-running process answering many concurrent queries.
    pub fn server() -> Self {
        Self {
            index: IndexOptions {
                stripe_count: 100,
                ..IndexOptions::default()
            },
            search: SearchOptions {
                max_depth: 10,
                permits: 8,
                coalesce: true,
            },
        }
    }

    /// Tiny lock and permit counts so contention paths are hit with little data.
    pub fn testing() -> Self {
        Self {
            index: IndexOptions {
                over_provision: 20,
                headroom: 16,
                stripe_count: 2,
                probe_limit: 100,
            },
            search: SearchOptions {
                max_depth: 10,
                permits: 1,
                coalesce: false,
            },
        }
    }

    /// Validates both sections.
    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        self.search.validate()
    }
}
