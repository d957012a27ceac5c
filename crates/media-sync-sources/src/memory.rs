// In-process stores backing the memory and file adapters

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_sync_models::{
    Account, Activities, Artifact, ArtifactAction, ArtifactBatch, Domain, DomainState, ItemKey,
    LibraryItem, MediaIds, MediaType, RemoteItem,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::SourceError;
use crate::traits::{LocalLibrary, RemoteService};

/// Library contents per account
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LibraryStore {
    #[serde(default)]
    pub accounts: BTreeMap<u32, Vec<LibraryItem>>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, account_id: u32, item: LibraryItem) -> Self {
        self.accounts.entry(account_id).or_default().push(item);
        self
    }

    pub fn items(&self, account_id: u32, media_type: MediaType) -> Vec<LibraryItem> {
        self.accounts
            .get(&account_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.media_type == media_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn item(&self, account_id: u32, key: &ItemKey) -> Option<&LibraryItem> {
        self.accounts
            .get(&account_id)
            .and_then(|items| items.iter().find(|item| &item.key == key))
    }

    pub fn write(
        &mut self,
        account_id: u32,
        key: &ItemKey,
        domain: Domain,
        state: Option<&DomainState>,
    ) -> Result<(), SourceError> {
        let item = self
            .accounts
            .get_mut(&account_id)
            .and_then(|items| items.iter_mut().find(|item| &item.key == key))
            .ok_or_else(|| SourceError::data(format!("library item {} not found", key)))?;

        match state {
            Some(state) if state.domain() != domain => {
                return Err(SourceError::data(format!(
                    "state for {} written to {} domain",
                    state.domain(),
                    domain
                )));
            }
            Some(state) => item.set_state(state.clone()),
            None => item.clear_state(domain),
        }
        Ok(())
    }
}

/// One remote item plus the time the remote last touched it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRecord {
    pub item: RemoteItem,
    pub updated_at: DateTime<Utc>,
}

/// Remote account contents plus its activity watermark
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteStore {
    #[serde(default)]
    pub activities: Activities,
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
}

impl RemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item and advance the bucket's activity to `updated_at`
    pub fn with_item(mut self, item: RemoteItem, updated_at: DateTime<Utc>) -> Self {
        self.upsert(item, updated_at);
        self
    }

    pub fn with_activity(mut self, domain: Domain, media_type: MediaType, at: DateTime<Utc>) -> Self {
        self.activities.set(domain, media_type, at);
        self
    }

    fn in_bucket(record: &RemoteRecord, domain: Domain, media_type: MediaType) -> bool {
        record.item.state.domain() == domain && record.item.media_type == media_type
    }

    fn touch(&mut self, domain: Domain, media_type: MediaType, at: DateTime<Utc>) {
        let newer = self
            .activities
            .get(domain, media_type)
            .map(|current| at > current)
            .unwrap_or(true);
        if newer {
            self.activities.set(domain, media_type, at);
        }
    }

    pub fn get(&self, domain: Domain, media_type: MediaType) -> Vec<RemoteItem> {
        self.records
            .iter()
            .filter(|r| Self::in_bucket(r, domain, media_type))
            .map(|r| r.item.clone())
            .collect()
    }

    pub fn get_since(
        &self,
        domain: Domain,
        media_type: MediaType,
        since: Option<DateTime<Utc>>,
    ) -> Vec<RemoteItem> {
        self.records
            .iter()
            .filter(|r| Self::in_bucket(r, domain, media_type))
            .filter(|r| since.map(|since| r.updated_at > since).unwrap_or(true))
            .map(|r| r.item.clone())
            .collect()
    }

    pub fn upsert(&mut self, item: RemoteItem, at: DateTime<Utc>) {
        let domain = item.state.domain();
        let media_type = item.media_type;
        let existing = self
            .records
            .iter_mut()
            .find(|r| Self::in_bucket(r, domain, media_type) && r.item.ids.intersects(&item.ids));

        match existing {
            Some(record) => {
                record.item.ids.merge(&item.ids);
                record.item.state = item.state;
                if item.title.is_some() {
                    record.item.title = item.title;
                }
                record.updated_at = at;
            }
            None => self.records.push(RemoteRecord { item, updated_at: at }),
        }
        self.touch(domain, media_type, at);
    }

    pub fn remove(&mut self, domain: Domain, media_type: MediaType, ids: &MediaIds, at: DateTime<Utc>) {
        let before = self.records.len();
        self.records
            .retain(|r| !(Self::in_bucket(r, domain, media_type) && r.item.ids.intersects(ids)));
        if self.records.len() != before {
            self.touch(domain, media_type, at);
        }
    }

    /// Apply one group of artifacts
    pub fn apply(
        &mut self,
        domain: Domain,
        action: ArtifactAction,
        artifacts: &[Artifact],
        at: DateTime<Utc>,
    ) -> Result<(), SourceError> {
        for artifact in artifacts {
            if artifact.domain != domain {
                return Err(SourceError::data(format!(
                    "artifact for {} submitted to {} group",
                    artifact.domain, domain
                )));
            }
            match action {
                ArtifactAction::Add => {
                    let state = artifact.state.clone().ok_or_else(|| {
                        SourceError::data(format!("add for {} carries no state", artifact.key))
                    })?;
                    self.upsert(RemoteItem::new(artifact.ids.clone(), artifact.media_type, state), at);
                }
                ArtifactAction::Remove => self.remove(domain, artifact.media_type, &artifact.ids, at),
            }
        }
        Ok(())
    }
}

/// A local write observed by the in-memory library
#[derive(Debug, Clone, PartialEq)]
pub struct LocalWrite {
    pub account_id: u32,
    pub key: ItemKey,
    pub domain: Domain,
    pub state: Option<DomainState>,
}

pub struct InMemoryLibrary {
    store: RwLock<LibraryStore>,
    writes: Mutex<Vec<LocalWrite>>,
    failing: RwLock<HashSet<MediaType>>,
    reject_writes: AtomicBool,
}

impl InMemoryLibrary {
    pub fn new(store: LibraryStore) -> Self {
        Self {
            store: RwLock::new(store),
            writes: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            reject_writes: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> LibraryStore {
        self.store.read().await.clone()
    }

    pub async fn writes(&self) -> Vec<LocalWrite> {
        self.writes.lock().await.clone()
    }

    /// Make `items` fail for one media type
    pub async fn fail_reads_for(&self, media_type: MediaType) {
        self.failing.write().await.insert(media_type);
    }

    /// Make every `write` fail with a data error
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Release);
    }
}

#[async_trait]
impl LocalLibrary for InMemoryLibrary {
    fn source_name(&self) -> &str {
        "memory-library"
    }

    async fn items(&self, account: &Account, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError> {
        if self.failing.read().await.contains(&media_type) {
            return Err(SourceError::transient(format!("library unavailable for {}", media_type)));
        }
        Ok(self.store.read().await.items(account.id, media_type))
    }

    async fn write(
        &self,
        account: &Account,
        key: &ItemKey,
        domain: Domain,
        state: Option<&DomainState>,
    ) -> Result<(), SourceError> {
        if self.reject_writes.load(Ordering::Acquire) {
            return Err(SourceError::data(format!("library refused {} write for {}", domain, key)));
        }
        self.store.write().await.write(account.id, key, domain, state)?;
        self.writes.lock().await.push(LocalWrite {
            account_id: account.id,
            key: key.clone(),
            domain,
            state: state.cloned(),
        });
        Ok(())
    }
}

pub struct InMemoryRemote {
    store: RwLock<RemoteStore>,
    submitted: Mutex<Vec<ArtifactBatch>>,
    failing: RwLock<HashSet<(Domain, MediaType)>>,
    failing_since: RwLock<HashSet<(Domain, MediaType)>>,
    fail_activities: AtomicBool,
    fail_submit: AtomicBool,
}

impl InMemoryRemote {
    pub fn new(store: RemoteStore) -> Self {
        Self {
            store: RwLock::new(store),
            submitted: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            failing_since: RwLock::new(HashSet::new()),
            fail_activities: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> RemoteStore {
        self.store.read().await.clone()
    }

    /// Batches received through `submit`, one entry per call
    pub async fn submitted(&self) -> Vec<ArtifactBatch> {
        self.submitted.lock().await.clone()
    }

    pub async fn fail_reads_for(&self, domain: Domain, media_type: MediaType) {
        self.failing.write().await.insert((domain, media_type));
    }

    /// Make only `get_since` fail for one bucket; full reads keep working
    pub async fn fail_incremental_reads_for(&self, domain: Domain, media_type: MediaType) {
        self.failing_since.write().await.insert((domain, media_type));
    }

    pub fn fail_activities(&self, fail: bool) {
        self.fail_activities.store(fail, Ordering::Release);
    }

    pub fn fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::Release);
    }

    /// Simulate a change made on the remote side outside of a sync run
    pub async fn touch_item(&self, item: RemoteItem, at: DateTime<Utc>) {
        self.store.write().await.upsert(item, at);
    }

    async fn check_read(&self, domain: Domain, media_type: MediaType) -> Result<(), SourceError> {
        if self.failing.read().await.contains(&(domain, media_type)) {
            return Err(SourceError::transient(format!(
                "remote unavailable for {}/{}",
                domain, media_type
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteService for InMemoryRemote {
    fn source_name(&self) -> &str {
        "memory-remote"
    }

    async fn last_activities(&self) -> Result<Activities, SourceError> {
        if self.fail_activities.load(Ordering::Acquire) {
            return Err(SourceError::transient("last activities unavailable"));
        }
        Ok(self.store.read().await.activities.clone())
    }

    async fn get(&self, domain: Domain, media_type: MediaType) -> Result<Vec<RemoteItem>, SourceError> {
        self.check_read(domain, media_type).await?;
        Ok(self.store.read().await.get(domain, media_type))
    }

    async fn get_since(
        &self,
        domain: Domain,
        media_type: MediaType,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteItem>, SourceError> {
        self.check_read(domain, media_type).await?;
        if self.failing_since.read().await.contains(&(domain, media_type)) {
            return Err(SourceError::transient(format!(
                "timeout reading {}/{} changes",
                domain, media_type
            )));
        }
        Ok(self.store.read().await.get_since(domain, media_type, since))
    }

    async fn add(&self, domain: Domain, items: &[Artifact]) -> Result<(), SourceError> {
        self.store
            .write()
            .await
            .apply(domain, ArtifactAction::Add, items, Utc::now())
    }

    async fn remove(&self, domain: Domain, items: &[Artifact]) -> Result<(), SourceError> {
        self.store
            .write()
            .await
            .apply(domain, ArtifactAction::Remove, items, Utc::now())
    }

    async fn submit(&self, batch: &ArtifactBatch) -> Result<(), SourceError> {
        self.submitted.lock().await.push(batch.clone());
        if self.fail_submit.load(Ordering::Acquire) {
            return Err(SourceError::transient("batch endpoint unavailable"));
        }

        let now = Utc::now();
        let mut store = self.store.write().await;
        for domain in Domain::ALL {
            for action in [ArtifactAction::Add, ArtifactAction::Remove] {
                let group = batch.group(domain, action);
                if !group.is_empty() {
                    store.apply(domain, action, &group, now)?;
                }
            }
        }
        debug!(artifacts = batch.len(), "Applied submitted batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorKind;
    use chrono::TimeZone;
    use media_sync_models::{Rating, Watched};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_remote_upsert_matches_by_any_id() {
        let mut store = RemoteStore::new().with_item(
            RemoteItem::new(
                MediaIds::new().with_imdb("tt1"),
                MediaType::Movie,
                DomainState::Rating(Rating::new(7, Some(at(1)))),
            ),
            at(1),
        );
        store.upsert(
            RemoteItem::new(
                MediaIds::new().with_imdb("tt1").with_tmdb(5),
                MediaType::Movie,
                DomainState::Rating(Rating::new(9, Some(at(2)))),
            ),
            at(2),
        );

        let ratings = store.get(Domain::Ratings, MediaType::Movie);
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].ids.tmdb_id, Some(5));
        assert_eq!(store.activities.get(Domain::Ratings, MediaType::Movie), Some(at(2)));
        assert_eq!(store.get_since(Domain::Ratings, MediaType::Movie, Some(at(2))).len(), 0);
        assert_eq!(store.get_since(Domain::Ratings, MediaType::Movie, Some(at(1))).len(), 1);
    }

    #[test]
    fn test_library_write_rejects_unknown_key() {
        let mut store = LibraryStore::new().with_item(
            1,
            LibraryItem::new("101", MediaIds::new(), MediaType::Movie),
        );
        let state = DomainState::Watched(Watched::watched(None));
        assert!(store.write(1, &ItemKey::from("101"), Domain::Watched, Some(&state)).is_ok());
        assert!(store.write(1, &ItemKey::from("999"), Domain::Watched, Some(&state)).is_err());
        assert!(store.write(1, &ItemKey::from("101"), Domain::Ratings, Some(&state)).is_err());
    }

    #[tokio::test]
    async fn test_submit_records_each_call() {
        let remote = InMemoryRemote::new(RemoteStore::new());
        let artifact = Artifact {
            key: ItemKey::from("101"),
            ids: MediaIds::new().with_imdb("tt1"),
            media_type: MediaType::Movie,
            domain: Domain::Ratings,
            action: ArtifactAction::Add,
            state: Some(DomainState::Rating(Rating::new(8, None))),
        };
        let batch = ArtifactBatch { artifacts: vec![artifact] };

        remote.submit(&batch).await.unwrap();

        assert_eq!(remote.submitted().await.len(), 1);
        assert_eq!(remote.get(Domain::Ratings, MediaType::Movie).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_incremental_read_failure_leaves_full_reads() {
        let remote = InMemoryRemote::new(RemoteStore::new().with_item(
            RemoteItem::new(
                MediaIds::new().with_imdb("tt1"),
                MediaType::Movie,
                DomainState::Watched(Watched::watched(Some(at(1)))),
            ),
            at(1),
        ));
        remote.fail_incremental_reads_for(Domain::Watched, MediaType::Movie).await;

        assert_eq!(remote.get(Domain::Watched, MediaType::Movie).await.unwrap().len(), 1);
        let err = remote
            .get_since(Domain::Watched, MediaType::Movie, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SourceErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_rejected_writes_leave_store_untouched() {
        let library = InMemoryLibrary::new(LibraryStore::new().with_item(
            1,
            LibraryItem::new("101", MediaIds::new(), MediaType::Movie),
        ));
        library.reject_writes(true);
        let state = DomainState::Watched(Watched::watched(None));

        let err = library
            .write(&Account { id: 1, ..Account::default() }, &ItemKey::from("101"), Domain::Watched, Some(&state))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SourceErrorKind::Data);
        assert!(library.writes().await.is_empty());
    }
}
