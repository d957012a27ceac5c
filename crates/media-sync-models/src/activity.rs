use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::Domain;
use crate::media::MediaType;

/// Remote "last activities" watermark
///
/// One timestamp per (domain, media type): the last time the remote side saw
/// a change in that bucket. Keys are stored as `domain:media_type` so the
/// watermark serializes as a flat JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activities {
    #[serde(default)]
    pub entries: BTreeMap<String, DateTime<Utc>>,
}

impl Activities {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(domain: Domain, media_type: MediaType) -> String {
        format!("{}:{}", domain.as_str(), media_type.as_str())
    }

    pub fn get(&self, domain: Domain, media_type: MediaType) -> Option<DateTime<Utc>> {
        self.entries.get(&Self::bucket(domain, media_type)).copied()
    }

    pub fn set(&mut self, domain: Domain, media_type: MediaType, at: DateTime<Utc>) {
        self.entries.insert(Self::bucket(domain, media_type), at);
    }

    pub fn with(mut self, domain: Domain, media_type: MediaType, at: DateTime<Utc>) -> Self {
        self.set(domain, media_type, at);
        self
    }

    /// Whether this watermark reports activity in a bucket newer than `previous`
    ///
    /// A bucket the remote never reported is untouched. A bucket missing from
    /// `previous` counts as touched.
    pub fn touched_since(&self, previous: &Activities, domain: Domain, media_type: MediaType) -> bool {
        match (self.get(domain, media_type), previous.get(domain, media_type)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(now), Some(before)) => now > before,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
