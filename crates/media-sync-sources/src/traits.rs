use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_sync_models::{
    Account, Activities, Artifact, ArtifactAction, ArtifactBatch, Domain, DomainState, ItemKey,
    LibraryItem, MediaType, RemoteItem,
};

use crate::error::SourceError;

/// The personal media library ("local side")
#[async_trait]
pub trait LocalLibrary: Send + Sync {
    fn source_name(&self) -> &str;

    /// Every item of one media type with the account's per-domain states
    async fn items(&self, account: &Account, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError>;

    /// Apply one pulled value; `None` clears the domain state
    async fn write(
        &self,
        account: &Account,
        key: &ItemKey,
        domain: Domain,
        state: Option<&DomainState>,
    ) -> Result<(), SourceError>;
}

/// The remote watch-tracking service ("remote side")
#[async_trait]
pub trait RemoteService: Send + Sync {
    fn source_name(&self) -> &str;

    async fn last_activities(&self) -> Result<Activities, SourceError>;

    async fn get(&self, domain: Domain, media_type: MediaType) -> Result<Vec<RemoteItem>, SourceError>;

    /// Items touched after `since`; `None` returns everything in the bucket
    async fn get_since(
        &self,
        domain: Domain,
        media_type: MediaType,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteItem>, SourceError>;

    async fn add(&self, domain: Domain, items: &[Artifact]) -> Result<(), SourceError>;

    async fn remove(&self, domain: Domain, items: &[Artifact]) -> Result<(), SourceError>;

    /// Send a whole run's artifacts
    ///
    /// Services with a bulk endpoint override this to make one request; the
    /// default issues one add and one remove call per non-empty domain group.
    async fn submit(&self, batch: &ArtifactBatch) -> Result<(), SourceError> {
        for domain in Domain::ALL {
            let adds = batch.group(domain, ArtifactAction::Add);
            if !adds.is_empty() {
                self.add(domain, &adds).await?;
            }
            let removes = batch.group(domain, ArtifactAction::Remove);
            if !removes.is_empty() {
                self.remove(domain, &removes).await?;
            }
        }
        Ok(())
    }
}
