use media_sync_models::{Artifact, ArtifactBatch, Domain, ItemKey};
use media_sync_sources::RemoteService;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::SyncError;

/// Outbound mutations of one run
///
/// A later artifact for the same (domain, key) replaces the earlier one in
/// place. `flush` consumes the queue, so a run can send it at most once;
/// dropping the queue discards everything unsent.
#[derive(Debug, Default)]
pub struct ActionQueue {
    artifacts: Vec<Artifact>,
    index: HashMap<(Domain, ItemKey), usize>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, artifact: Artifact) {
        let slot = (artifact.domain, artifact.key.clone());
        match self.index.get(&slot) {
            Some(&pos) => {
                debug!(
                    domain = %artifact.domain,
                    key = %artifact.key,
                    "Replacing queued artifact"
                );
                self.artifacts[pos] = artifact;
            }
            None => {
                self.index.insert(slot, self.artifacts.len());
                self.artifacts.push(artifact);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn into_batch(self) -> ArtifactBatch {
        ArtifactBatch {
            artifacts: self.artifacts,
        }
    }

    /// Send everything in one batched call; returns the number of artifacts
    pub async fn flush(self, remote: &dyn RemoteService) -> Result<usize, SyncError> {
        if self.is_empty() {
            debug!("Action queue empty, nothing to flush");
            return Ok(0);
        }

        let batch = self.into_batch();
        let count = batch.len();
        remote.submit(&batch).await?;
        info!(
            operation = "flush",
            remote = remote.source_name(),
            artifacts = count,
            "Flushed outbound artifacts"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_sync_models::{ArtifactAction, DomainState, MediaIds, MediaType, Rating};
    use media_sync_sources::{InMemoryRemote, RemoteStore};

    fn artifact(key: &str, action: ArtifactAction, value: Option<u8>) -> Artifact {
        Artifact {
            key: ItemKey::from(key),
            ids: MediaIds::new().with_imdb(format!("tt{}", key)),
            media_type: MediaType::Movie,
            domain: Domain::Ratings,
            action,
            state: value.map(|v| DomainState::Rating(Rating::new(v, None))),
        }
    }

    #[test]
    fn test_later_artifact_replaces_earlier() {
        let mut queue = ActionQueue::new();
        queue.add(artifact("1", ArtifactAction::Add, Some(5)));
        queue.add(artifact("2", ArtifactAction::Add, Some(6)));
        queue.add(artifact("1", ArtifactAction::Remove, None));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.artifacts()[0].action, ArtifactAction::Remove);
        assert_eq!(queue.artifacts()[1].key, ItemKey::from("2"));
    }

    #[tokio::test]
    async fn test_flush_submits_one_batch() {
        let remote = InMemoryRemote::new(RemoteStore::new());
        let mut queue = ActionQueue::new();
        queue.add(artifact("1", ArtifactAction::Add, Some(5)));
        queue.add(artifact("2", ArtifactAction::Add, Some(6)));

        let sent = queue.flush(&remote).await.unwrap();

        assert_eq!(sent, 2);
        assert_eq!(remote.submitted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_flush_skips_remote() {
        let remote = InMemoryRemote::new(RemoteStore::new());
        assert_eq!(ActionQueue::new().flush(&remote).await.unwrap(), 0);
        assert!(remote.submitted().await.is_empty());
    }
}
