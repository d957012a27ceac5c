use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked category of per-item state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Watched,
    Ratings,
    Collection,
    Playback,
    Watchlist,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Watched,
        Domain::Ratings,
        Domain::Collection,
        Domain::Playback,
        Domain::Watchlist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Watched => "watched",
            Domain::Ratings => "ratings",
            Domain::Collection => "collection",
            Domain::Playback => "playback",
            Domain::Watchlist => "watchlist",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "watched" | "watched_history" | "history" => Some(Domain::Watched),
            "ratings" | "rating" => Some(Domain::Ratings),
            "collection" => Some(Domain::Collection),
            "playback" | "progress" => Some(Domain::Playback),
            "watchlist" | "lists" => Some(Domain::Watchlist),
            _ => None,
        }
    }

    /// Media types a domain can carry state for
    pub fn media_types(&self) -> &'static [crate::MediaType] {
        use crate::MediaType::*;
        match self {
            Domain::Watched => &[Movie, Episode],
            Domain::Ratings => &[Movie, Show, Season, Episode],
            Domain::Collection => &[Movie, Episode],
            Domain::Playback => &[Movie, Episode],
            Domain::Watchlist => &[Movie, Show],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
