use media_sync_models::{ItemKey, MediaType};
use std::collections::{HashMap, HashSet};

/// Keys not yet matched during one removal-detection scan
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    order: Vec<ItemKey>,
    live: HashSet<ItemKey>,
}

impl PendingSet {
    pub fn seed<'a>(keys: impl IntoIterator<Item = &'a ItemKey>) -> Self {
        let mut set = Self::default();
        for key in keys {
            if set.live.insert(key.clone()) {
                set.order.push(key.clone());
            }
        }
        set
    }

    /// Mark a key as matched; false when it was not pending
    pub fn remove(&mut self, key: &ItemKey) -> bool {
        self.live.remove(key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.live.contains(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// What is left, in seed order
    pub fn remaining(&self) -> Vec<ItemKey> {
        self.order
            .iter()
            .filter(|key| self.live.contains(*key))
            .cloned()
            .collect()
    }
}

/// Pending sets of one run, one per media type
#[derive(Debug, Default)]
pub struct Pending {
    sets: HashMap<MediaType, PendingSet>,
}

impl Pending {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scan, replacing any earlier set for the media type
    pub fn seed<'a>(&mut self, media_type: MediaType, keys: impl IntoIterator<Item = &'a ItemKey>) {
        self.sets.insert(media_type, PendingSet::seed(keys));
    }

    pub fn remove(&mut self, media_type: MediaType, key: &ItemKey) -> bool {
        self.sets
            .get_mut(&media_type)
            .map(|set| set.remove(key))
            .unwrap_or(false)
    }

    pub fn get(&self, media_type: MediaType) -> Option<&PendingSet> {
        self.sets.get(&media_type)
    }

    /// End a scan and return the unmatched keys
    pub fn take_remaining(&mut self, media_type: MediaType) -> Vec<ItemKey> {
        self.sets
            .remove(&media_type)
            .map(|set| set.remaining())
            .unwrap_or_default()
    }
}
