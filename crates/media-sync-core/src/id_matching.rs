// ID matching: align remote items onto local library keys

use media_sync_models::{Domain, ItemKey, LibraryItem, MediaIds, MediaType, RemoteItem};
use std::collections::HashMap;
use tracing::debug;

use crate::snapshot::Snapshot;

/// Lookup table from (media type, authority, value) to library key
///
/// Built once per run from the primed library. Identifier spaces are scoped
/// by media type because authorities such as tmdb reuse numbers across
/// movies and shows.
#[derive(Debug, Default)]
pub struct IdIndex {
    by_pair: HashMap<(MediaType, &'static str, String), ItemKey>,
    ids: HashMap<ItemKey, MediaIds>,
    collisions: usize,
}

/// Remote items of one bucket keyed by library key
#[derive(Debug, Default)]
pub struct Alignment {
    pub snapshot: Snapshot,
    /// Items whose identifiers match no library item
    pub unmatched: usize,
    /// Items with a state outside the domain's range
    pub invalid: usize,
}

impl IdIndex {
    pub fn build<'a>(items: impl IntoIterator<Item = &'a LibraryItem>) -> Self {
        let mut index = Self::default();
        for item in items {
            for (authority, value) in item.ids.pairs() {
                let slot = (item.media_type, authority, value);
                match index.by_pair.get(&slot) {
                    Some(existing) if existing != &item.key => {
                        // First claim wins
                        index.collisions += 1;
                        debug!(
                            "Identifier {}:{} claimed by both {} and {}",
                            slot.1, slot.2, existing, item.key
                        );
                    }
                    Some(_) => {}
                    None => {
                        index.by_pair.insert(slot, item.key.clone());
                    }
                }
            }
            index.ids.insert(item.key.clone(), item.ids.clone());
        }
        index
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Library key of the item sharing any identifier with `ids`
    pub fn resolve(&self, media_type: MediaType, ids: &MediaIds) -> Option<&ItemKey> {
        ids.pairs()
            .into_iter()
            .find_map(|(authority, value)| self.by_pair.get(&(media_type, authority, value)))
    }

    /// Identifier set of a library item, for outbound artifacts
    pub fn ids(&self, key: &ItemKey) -> Option<&MediaIds> {
        self.ids.get(key)
    }

    /// Key remote items of one bucket by library key
    ///
    /// Items that match nothing or carry an invalid state are dropped and
    /// counted. When two remote items resolve to the same key the later one
    /// wins.
    pub fn align(&self, domain: Domain, media_type: MediaType, items: Vec<RemoteItem>) -> Alignment {
        let mut alignment = Alignment::default();

        for item in items {
            if item.media_type != media_type || item.state.domain() != domain {
                alignment.invalid += 1;
                continue;
            }
            if let Err(reason) = item.state.validate() {
                alignment.invalid += 1;
                debug!(
                    "Dropping remote {} {}: {}",
                    media_type,
                    item.ids.primary_id().unwrap_or_default(),
                    reason
                );
                continue;
            }

            match self.resolve(media_type, &item.ids) {
                Some(key) => alignment.snapshot.insert(key.clone(), item.state),
                None => {
                    alignment.unmatched += 1;
                    if alignment.unmatched <= 5 {
                        debug!(
                            "No library match for remote {} {} ({})",
                            media_type,
                            item.ids.primary_id().unwrap_or_else(|| "<no ids>".to_string()),
                            item.title.as_deref().unwrap_or("untitled")
                        );
                    }
                }
            }
        }

        alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_sync_models::{DomainState, Rating};

    fn library() -> Vec<LibraryItem> {
        vec![
            LibraryItem::new("101", MediaIds::new().with_imdb("tt1").with_tmdb(11), MediaType::Movie),
            LibraryItem::new("202", MediaIds::new().with_tmdb(11), MediaType::Show),
        ]
    }

    #[test]
    fn test_resolve_is_scoped_by_media_type() {
        let items = library();
        let index = IdIndex::build(&items);

        let ids = MediaIds::new().with_tmdb(11);
        assert_eq!(index.resolve(MediaType::Movie, &ids), Some(&ItemKey::from("101")));
        assert_eq!(index.resolve(MediaType::Show, &ids), Some(&ItemKey::from("202")));
        assert_eq!(index.resolve(MediaType::Episode, &ids), None);
    }

    #[test]
    fn test_align_drops_unmatched_and_invalid() {
        let items = library();
        let index = IdIndex::build(&items);
        let remote = vec![
            RemoteItem::new(
                MediaIds::new().with_imdb("tt1"),
                MediaType::Movie,
                DomainState::Rating(Rating::new(8, None)),
            ),
            RemoteItem::new(
                MediaIds::new().with_imdb("tt999"),
                MediaType::Movie,
                DomainState::Rating(Rating::new(5, None)),
            ),
            RemoteItem::new(
                MediaIds::new().with_tmdb(11),
                MediaType::Movie,
                DomainState::Rating(Rating::new(42, None)),
            ),
        ];

        let alignment = index.align(Domain::Ratings, MediaType::Movie, remote);
        assert_eq!(alignment.snapshot.len(), 1);
        assert_eq!(alignment.unmatched, 1);
        assert_eq!(alignment.invalid, 1);
    }
}
