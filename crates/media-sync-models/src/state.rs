use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::{FieldValue, Properties};
use crate::domain::Domain;

/// How a domain state counts for presence on its side
///
/// `Negative` is an explicit "no" (e.g. `is_watched = false`) and is treated as
/// an absence that still carries information. `Unknown` means the tracked
/// field is not set at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Positive,
    Negative,
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Watched {
    pub is_watched: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plays: u32,
}

impl Watched {
    pub fn watched(at: Option<DateTime<Utc>>) -> Self {
        Self {
            is_watched: Some(true),
            last_watched_at: at,
            plays: 1,
        }
    }

    pub fn unwatched() -> Self {
        Self {
            is_watched: Some(false),
            last_watched_at: None,
            plays: 0,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub value: Option<u8>, // 1-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_at: Option<DateTime<Utc>>,
}

impl Rating {
    pub fn new(value: u8, rated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: Some(value),
            rated_at,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Playback {
    /// Percentage in [0, 100]; 0 is an explicit reset
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListMembership {
    pub list_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl ListMembership {
    pub const WATCHLIST: &'static str = "watchlist";

    pub fn new(list_id: impl Into<String>, index: Option<u32>) -> Self {
        Self {
            list_id: list_id.into(),
            index,
        }
    }

    pub fn watchlist(index: Option<u32>) -> Self {
        Self::new(Self::WATCHLIST, index)
    }
}

/// Every list one item sits on, ordered by list id
///
/// The watchlist is the list with id `watchlist`; any other id is a custom
/// list. An empty set is an explicit "on no list".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Lists {
    #[serde(default)]
    pub entries: Vec<ListMembership>,
}

impl Lists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a membership, replacing any entry for the same list
    pub fn with(mut self, membership: ListMembership) -> Self {
        self.insert(membership);
        self
    }

    pub fn insert(&mut self, membership: ListMembership) {
        match self
            .entries
            .binary_search_by(|e| e.list_id.as_str().cmp(membership.list_id.as_str()))
        {
            Ok(pos) => self.entries[pos] = membership,
            Err(pos) => self.entries.insert(pos, membership),
        }
    }

    pub fn get(&self, list_id: &str) -> Option<&ListMembership> {
        self.entries.iter().find(|e| e.list_id == list_id)
    }

    pub fn contains(&self, list_id: &str) -> bool {
        self.get(list_id).is_some()
    }

    pub fn list_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.list_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<ListMembership> for Lists {
    fn from_iter<I: IntoIterator<Item = ListMembership>>(iter: I) -> Self {
        let mut lists = Lists::new();
        for membership in iter {
            lists.insert(membership);
        }
        lists
    }
}

/// Per-domain attribute bag attached to one item on one side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum DomainState {
    Watched(Watched),
    Rating(Rating),
    Collection(Collection),
    Playback(Playback),
    List(Lists),
}

impl DomainState {
    pub fn domain(&self) -> Domain {
        match self {
            DomainState::Watched(_) => Domain::Watched,
            DomainState::Rating(_) => Domain::Ratings,
            DomainState::Collection(_) => Domain::Collection,
            DomainState::Playback(_) => Domain::Playback,
            DomainState::List(_) => Domain::Watchlist,
        }
    }

    pub fn presence(&self) -> Presence {
        match self {
            DomainState::Watched(w) => match w.is_watched {
                Some(true) => Presence::Positive,
                Some(false) => Presence::Negative,
                None => Presence::Unknown,
            },
            DomainState::Rating(r) => match r.value {
                Some(_) => Presence::Positive,
                None => Presence::Unknown,
            },
            DomainState::Collection(c) => match c.collected_at {
                Some(_) => Presence::Positive,
                None => Presence::Unknown,
            },
            DomainState::Playback(p) => match p.progress {
                Some(progress) if progress > 0.0 => Presence::Positive,
                Some(_) => Presence::Negative,
                None => Presence::Unknown,
            },
            DomainState::List(l) if l.is_empty() => Presence::Negative,
            DomainState::List(_) => Presence::Positive,
        }
    }

    /// Fields compared when both sides are present
    ///
    /// Collection carries no field beyond presence, so two present collection
    /// states never differ. List states differ when the set of list ids does.
    pub fn tracked_fields(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            DomainState::Watched(w) => w
                .is_watched
                .map(|v| vec![("is_watched", FieldValue::Bool(v))])
                .unwrap_or_default(),
            DomainState::Rating(r) => r
                .value
                .map(|v| vec![("value", FieldValue::Int(v as i64))])
                .unwrap_or_default(),
            DomainState::Playback(p) => p
                .progress
                .map(|v| vec![("progress", FieldValue::Float(v))])
                .unwrap_or_default(),
            DomainState::List(l) if !l.is_empty() => {
                vec![("lists", FieldValue::Text(l.list_ids().join(",")))]
            }
            DomainState::Collection(_) | DomainState::List(_) => Vec::new(),
        }
    }

    /// Fields relevant for audit and display
    pub fn properties(&self) -> Properties {
        let mut props = Properties::new();
        let mut put = |name: &str, value: Option<FieldValue>| {
            if let Some(value) = value {
                props.insert(name.to_string(), value);
            }
        };
        match self {
            DomainState::Watched(w) => {
                put("is_watched", w.is_watched.map(FieldValue::Bool));
                put("last_watched_at", w.last_watched_at.map(FieldValue::Time));
                put("plays", Some(FieldValue::Int(w.plays as i64)));
            }
            DomainState::Rating(r) => {
                put("value", r.value.map(|v| FieldValue::Int(v as i64)));
                put("rated_at", r.rated_at.map(FieldValue::Time));
            }
            DomainState::Collection(c) => {
                put("collected_at", c.collected_at.map(FieldValue::Time));
            }
            DomainState::Playback(p) => {
                put("progress", p.progress.map(FieldValue::Float));
                put("paused_at", p.paused_at.map(FieldValue::Time));
            }
            DomainState::List(l) => {
                put("lists", Some(FieldValue::Text(l.list_ids().join(","))));
                for entry in &l.entries {
                    put(
                        &format!("index:{}", entry.list_id),
                        entry.index.map(|i| FieldValue::Int(i as i64)),
                    );
                }
            }
        }
        props
    }

    /// When this side last changed the value, if the side reports it
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            DomainState::Watched(w) => w.last_watched_at,
            DomainState::Rating(r) => r.rated_at,
            DomainState::Collection(c) => c.collected_at,
            DomainState::Playback(p) => p.paused_at,
            DomainState::List(_) => None,
        }
    }

    /// Reject values outside the domain's range
    pub fn validate(&self) -> Result<(), String> {
        match self {
            DomainState::Rating(Rating { value: Some(v), .. }) if !(1..=10).contains(v) => {
                Err(format!("rating {} outside 1-10", v))
            }
            DomainState::Playback(Playback { progress: Some(p), .. })
                if !p.is_finite() || !(0.0..=100.0).contains(p) =>
            {
                Err(format!("playback progress {} outside 0-100", p))
            }
            DomainState::List(l) if l.entries.iter().any(|e| e.list_id.is_empty()) => {
                Err("empty list id".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_unwatched_is_negative() {
        assert_eq!(DomainState::Watched(Watched::unwatched()).presence(), Presence::Negative);
        assert_eq!(DomainState::Watched(Watched::unknown()).presence(), Presence::Unknown);
        assert_eq!(DomainState::Watched(Watched::watched(None)).presence(), Presence::Positive);
    }

    #[test]
    fn test_playback_reset_is_negative() {
        let reset = DomainState::Playback(Playback { progress: Some(0.0), paused_at: None });
        assert_eq!(reset.presence(), Presence::Negative);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(DomainState::Rating(Rating::new(11, None)).validate().is_err());
        assert!(DomainState::Rating(Rating::new(7, None)).validate().is_ok());
        let bad = DomainState::Playback(Playback { progress: Some(140.0), paused_at: None });
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_item_can_sit_on_several_lists() {
        let lists = Lists::new()
            .with(ListMembership::new("favourites", Some(2)))
            .with(ListMembership::watchlist(Some(0)))
            .with(ListMembership::new("favourites", Some(5)));

        assert_eq!(lists.list_ids(), vec!["favourites", "watchlist"]);
        assert_eq!(lists.get("favourites").and_then(|m| m.index), Some(5));

        let state = DomainState::List(lists);
        assert_eq!(state.presence(), Presence::Positive);
        assert_eq!(
            state.tracked_fields(),
            vec![("lists", FieldValue::Text("favourites,watchlist".to_string()))]
        );
        assert_eq!(DomainState::List(Lists::new()).presence(), Presence::Negative);
    }

    #[test]
    fn test_serde_tagged_by_domain() {
        let state = DomainState::Rating(Rating::new(8, None));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["domain"], "rating");
        let back: DomainState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
