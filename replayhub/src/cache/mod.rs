//! Entity state cache.
//!
//! Last-known publish flag per video id. No eviction and no persistence:
//! the set is bounded by the catalog size and rebuilt by priming on restart.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Outcome of applying an observed publish flag against the cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagTransition {
    /// Id was not cached before; flag recorded.
    FirstSeen,
    /// Cached flag already matched the observed one.
    Unchanged,
    /// Cached flag differed; `from` is the previous value.
    Flipped { from: bool },
}

/// In-memory map of video id to last-known publish flag.
#[derive(Default)]
pub struct PublishStateCache {
    entries: DashMap<String, bool>,
}

impl PublishStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.entries.get(id).map(|flag| *flag)
    }

    pub fn set(&self, id: impl Into<String>, published: bool) {
        self.entries.insert(id.into(), published);
    }

    /// Seed the cache from known records. Existing entries are overwritten.
    pub fn prime<I>(&self, records: I)
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        for (id, published) in records {
            self.entries.insert(id, published);
        }
    }

    /// Record an observed flag and report the transition relative to the
    /// cached value. The read and write happen under one entry lock, so two
    /// concurrent observations of the same id cannot interleave and both
    /// report a flip.
    pub fn apply(&self, id: impl Into<String>, published: bool) -> FlagTransition {
        match self.entries.entry(id.into()) {
            Entry::Vacant(slot) => {
                slot.insert(published);
                FlagTransition::FirstSeen
            }
            Entry::Occupied(mut slot) => {
                let previous = *slot.get();
                if previous == published {
                    FlagTransition::Unchanged
                } else {
                    slot.insert(published);
                    FlagTransition::Flipped { from: previous }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
