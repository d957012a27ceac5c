use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Identifier set for one item, one optional value per naming authority
///
/// Two items refer to the same entity when their identifier sets share at
/// least one (authority, value) pair. `library_key` is the local library's own
/// key and only ever matches another library key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MediaIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trakt_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_key: Option<String>,
}

impl MediaIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_imdb(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_tmdb(mut self, tmdb_id: u32) -> Self {
        self.tmdb_id = Some(tmdb_id);
        self
    }

    pub fn with_tvdb(mut self, tvdb_id: u32) -> Self {
        self.tvdb_id = Some(tvdb_id);
        self
    }

    pub fn with_trakt(mut self, trakt_id: u64) -> Self {
        self.trakt_id = Some(trakt_id);
        self
    }

    pub fn with_library_key(mut self, key: impl Into<String>) -> Self {
        self.library_key = Some(key.into());
        self
    }

    /// Every (authority, value) pair present in this set
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref imdb) = self.imdb_id {
            pairs.push(("imdb", imdb.clone()));
        }
        if let Some(tmdb) = self.tmdb_id {
            pairs.push(("tmdb", tmdb.to_string()));
        }
        if let Some(tvdb) = self.tvdb_id {
            pairs.push(("tvdb", tvdb.to_string()));
        }
        if let Some(trakt) = self.trakt_id {
            pairs.push(("trakt", trakt.to_string()));
        }
        if let Some(ref slug) = self.slug {
            pairs.push(("slug", slug.clone()));
        }
        if let Some(ref key) = self.library_key {
            pairs.push(("library", key.clone()));
        }
        pairs
    }

    /// Get the primary identifier as `authority:value`
    ///
    /// Preference order: imdb, tmdb, tvdb, trakt, slug, library key.
    pub fn primary_id(&self) -> Option<String> {
        self.pairs()
            .into_iter()
            .next()
            .map(|(authority, value)| format!("{}:{}", authority, value))
    }

    /// Check whether both sets share at least one authority/value pair
    pub fn intersects(&self, other: &MediaIds) -> bool {
        fn same<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
            matches!((a, b), (Some(a), Some(b)) if a == b)
        }

        same(&self.imdb_id, &other.imdb_id)
            || same(&self.tmdb_id, &other.tmdb_id)
            || same(&self.tvdb_id, &other.tvdb_id)
            || same(&self.trakt_id, &other.trakt_id)
            || same(&self.slug, &other.slug)
            || same(&self.library_key, &other.library_key)
    }

    /// Merge IDs from another set, only filling in missing values
    pub fn merge(&mut self, other: &MediaIds) {
        if self.imdb_id.is_none() {
            self.imdb_id = other.imdb_id.clone();
        }
        if self.tmdb_id.is_none() {
            self.tmdb_id = other.tmdb_id;
        }
        if self.tvdb_id.is_none() {
            self.tvdb_id = other.tvdb_id;
        }
        if self.trakt_id.is_none() {
            self.trakt_id = other.trakt_id;
        }
        if self.slug.is_none() {
            self.slug = other.slug.clone();
        }
        if self.library_key.is_none() {
            self.library_key = other.library_key.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imdb_id.is_none()
            && self.tmdb_id.is_none()
            && self.tvdb_id.is_none()
            && self.trakt_id.is_none()
            && self.slug.is_none()
            && self.library_key.is_none()
    }

    /// Check if a specific ID type is available
    pub fn has_id(&self, id_type: &str) -> bool {
        match id_type.to_lowercase().as_str() {
            "imdb" => self.imdb_id.is_some(),
            "tmdb" => self.tmdb_id.is_some(),
            "tvdb" => self.tvdb_id.is_some(),
            "trakt" => self.trakt_id.is_some(),
            "slug" => self.slug.is_some(),
            "library" | "library_key" => self.library_key.is_some(),
            _ => false,
        }
    }
}

impl Hash for MediaIds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.imdb_id.hash(state);
        self.tmdb_id.hash(state);
        self.tvdb_id.hash(state);
        self.trakt_id.hash(state);
        self.slug.hash(state);
        self.library_key.hash(state);
    }
}
