use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::item::ItemKey;
use crate::media::MediaType;
use crate::media_ids::MediaIds;
use crate::state::DomainState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactAction {
    /// Add or overwrite the remote value
    Add,
    Remove,
}

/// A queued outbound mutation destined for the remote side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub key: ItemKey,
    pub ids: MediaIds,
    pub media_type: MediaType,
    pub domain: Domain,
    pub action: ArtifactAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DomainState>,
}

/// All artifacts of one run, grouped for a single batched submission
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtifactBatch {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactBatch {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Artifacts for one (domain, action) group, in queue order
    pub fn group(&self, domain: Domain, action: ArtifactAction) -> Vec<Artifact> {
        self.artifacts
            .iter()
            .filter(|a| a.domain == domain && a.action == action)
            .cloned()
            .collect()
    }
}
