use media_sync_models::{
    ChangeRecord, Domain, DomainState, FieldValue, ItemKey, LibraryItem, Presence,
};
use std::collections::{BTreeMap, HashMap};

/// Insertion-ordered `ItemKey -> DomainState` mapping for one side, one
/// domain and one media type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(ItemKey, DomainState)>,
    index: HashMap<ItemKey, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local side of one domain; items without a state for it are absent
    pub fn from_library(items: &[LibraryItem], domain: Domain) -> Self {
        let mut snapshot = Self::new();
        for item in items {
            if let Some(state) = item.state(domain) {
                snapshot.insert(item.key.clone(), state.clone());
            }
        }
        snapshot
    }

    /// Insert or replace; a replaced key keeps its position
    pub fn insert(&mut self, key: ItemKey, state: DomainState) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = state,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, state));
            }
        }
    }

    pub fn remove(&mut self, key: &ItemKey) -> Option<DomainState> {
        let pos = self.index.remove(key)?;
        let (_, state) = self.entries.remove(pos);
        for (i, (k, _)) in self.entries.iter().enumerate().skip(pos) {
            self.index.insert(k.clone(), i);
        }
        Some(state)
    }

    pub fn get(&self, key: &ItemKey) -> Option<&DomainState> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, &DomainState)> {
        self.entries.iter().map(|(k, s)| (k, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converge towards the side the records were computed against
    pub fn apply(&mut self, records: &[ChangeRecord]) {
        for record in records {
            match &record.target {
                Some(state) => self.insert(record.key.clone(), state.clone()),
                None => {
                    self.remove(&record.key);
                }
            }
        }
    }

    /// Tracked fields of every present entry, for convergence checks
    pub fn tracked_view(&self) -> BTreeMap<ItemKey, Vec<(&'static str, FieldValue)>> {
        self.entries
            .iter()
            .filter(|(_, state)| state.presence() == Presence::Positive)
            .map(|(key, state)| (key.clone(), state.tracked_fields()))
            .collect()
    }
}

impl FromIterator<(ItemKey, DomainState)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (ItemKey, DomainState)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (key, state) in iter {
            snapshot.insert(key, state);
        }
        snapshot
    }
}
