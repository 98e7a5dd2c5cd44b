//! Per-registration "last seen" tracking.

use std::collections::{HashMap, HashSet};

use super::registry::RegistrationKey;
use super::types::ContentId;

/// Maps each registration to the identifier of its newest seen item.
///
/// Also remembers which registrations have completed a successful fetch:
/// a feed that was empty at baseline has no watermark but is still seeded.
///
/// Owned by the poller; never shared across threads.
#[derive(Debug, Clone, Default)]
pub struct WatermarkStore {
    marks: HashMap<RegistrationKey, ContentId>,
    seeded: HashSet<RegistrationKey>,
}

impl WatermarkStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the watermark for a registration, if one has been seeded.
    #[must_use]
    pub fn get(&self, key: &RegistrationKey) -> Option<ContentId> {
        self.marks.get(key).copied()
    }

    /// Record `id` as the newest seen item for `key`.
    ///
    /// The stored value never decreases; a lower `id` is ignored. Returns the
    /// watermark in effect afterwards.
    pub fn set(&mut self, key: &RegistrationKey, id: ContentId) -> ContentId {
        let mark = self.marks.entry(key.clone()).or_insert(id);
        if id > *mark {
            *mark = id;
        }
        *mark
    }

    /// Record a successful fetch for `key`, whether or not it returned items.
    pub fn mark_seeded(&mut self, key: &RegistrationKey) {
        if !self.seeded.contains(key) {
            self.seeded.insert(key.clone());
        }
    }

    /// Whether `key` has been fetched successfully at least once.
    #[must_use]
    pub fn is_seeded(&self, key: &RegistrationKey) -> bool {
        self.seeded.contains(key) || self.marks.contains_key(key)
    }

    /// Number of registrations with a watermark.
    #[must_use]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Whether no watermark has been seeded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
