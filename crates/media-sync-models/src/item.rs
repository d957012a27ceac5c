use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Domain;
use crate::media::MediaType;
use crate::media_ids::MediaIds;
use crate::state::DomainState;

/// Canonical snapshot key for one item
///
/// The local library key when the item is known to the library, otherwise
/// the `authority:value` form of the item's primary identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(pub String);

impl ItemKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Library account whose per-user settings are being synced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u32,
    pub name: String,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            id: 1,
            name: "owner".to_string(),
        }
    }
}

/// One item of the local library with its per-domain states
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryItem {
    pub key: ItemKey,
    pub ids: MediaIds,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub states: Vec<DomainState>,
}

impl LibraryItem {
    pub fn new(key: impl Into<String>, ids: MediaIds, media_type: MediaType) -> Self {
        let key = ItemKey::new(key);
        let ids = if ids.library_key.is_none() {
            ids.with_library_key(key.as_str())
        } else {
            ids
        };
        Self {
            key,
            ids,
            media_type,
            title: None,
            states: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_state(mut self, state: DomainState) -> Self {
        self.set_state(state);
        self
    }

    pub fn state(&self, domain: Domain) -> Option<&DomainState> {
        self.states.iter().find(|s| s.domain() == domain)
    }

    /// Replace the state for the state's domain
    pub fn set_state(&mut self, state: DomainState) {
        let domain = state.domain();
        self.states.retain(|s| s.domain() != domain);
        self.states.push(state);
    }

    pub fn clear_state(&mut self, domain: Domain) {
        self.states.retain(|s| s.domain() != domain);
    }
}

/// One item as reported by the remote service for a single domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteItem {
    pub ids: MediaIds,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub state: DomainState,
}

impl RemoteItem {
    pub fn new(ids: MediaIds, media_type: MediaType, state: DomainState) -> Self {
        Self {
            ids,
            media_type,
            title: None,
            state,
        }
    }
}
