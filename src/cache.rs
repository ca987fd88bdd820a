use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};
use crate::models::{FeedEntry, QueryShape};

/// Session-scoped store of feed windows, one entry per requested [`QueryShape`].
///
/// There is no eviction; the number of entries is bounded by the number of pages visited.
/// Merging is not done here, see [`crate::merge`].
#[derive(Debug, Default)]
pub struct FeedCache {
    entries: HashMap<QueryShape, FeedEntry>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last entry written for exactly this shape.
    pub fn read(&self, shape: &QueryShape) -> Result<&FeedEntry> {
        self.entries
            .get(shape)
            .ok_or(Error::ShapeNotCached(*shape))
    }

    /// Replaces whatever was stored for `shape`.
    pub fn write(&mut self, shape: QueryShape, entry: FeedEntry) {
        debug!(
            "Caching {} links (count {}) for {shape:?}",
            entry.links.len(),
            entry.count
        );
        self.entries.insert(shape, entry);
    }

    /// Read, transform and write back a cached entry. Returns `false` if the shape isn't cached.
    pub fn update(&mut self, shape: &QueryShape, f: impl FnOnce(FeedEntry) -> FeedEntry) -> bool {
        match self.entries.remove(shape) {
            Some(entry) => {
                let updated = f(entry);
                self.write(*shape, updated);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, shape: &QueryShape) -> bool {
        self.entries.contains_key(shape)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
