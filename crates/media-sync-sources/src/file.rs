// JSON document adapters
//
// Each call reads the document from disk and mutations write it back, so
// several processes looking at the same files see each other's changes
// between runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_sync_models::{
    Account, Activities, Artifact, ArtifactAction, Domain, DomainState, ItemKey, LibraryItem,
    MediaType, RemoteItem,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::memory::{LibraryStore, RemoteStore};
use crate::traits::{LocalLibrary, RemoteService};

async fn load_document<T>(path: &Path) -> Result<T, SourceError>
where
    T: DeserializeOwned + Default,
{
    if !tokio::fs::try_exists(path).await? {
        debug!("Document {} does not exist, starting empty", path.display());
        return Ok(T::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str::<T>(&content).map_err(|e| {
        warn!("Document {} is corrupt: {}", path.display(), e);
        SourceError::corrupt(format!("{}: {}", path.display(), e))
    })
}

async fn save_document<T: Serialize>(path: &Path, document: &T) -> Result<(), SourceError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(document)?;

    // Readers only ever see a complete document
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Saved document {}", path.display());
    Ok(())
}

/// Library backed by a JSON [`LibraryStore`] document
pub struct FileLibrary {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<LibraryStore, SourceError> {
        load_document(&self.path).await
    }

    pub async fn save(&self, store: &LibraryStore) -> Result<(), SourceError> {
        let _guard = self.lock.lock().await;
        save_document(&self.path, store).await
    }
}

#[async_trait]
impl LocalLibrary for FileLibrary {
    fn source_name(&self) -> &str {
        "file-library"
    }

    async fn items(&self, account: &Account, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError> {
        let store = self.load().await?;
        let items = store.items(account.id, media_type);
        info!(
            "Loaded {} {} items for account {} from {}",
            items.len(),
            media_type,
            account.id,
            self.path.display()
        );
        Ok(items)
    }

    async fn write(
        &self,
        account: &Account,
        key: &ItemKey,
        domain: Domain,
        state: Option<&DomainState>,
    ) -> Result<(), SourceError> {
        let _guard = self.lock.lock().await;
        let mut store: LibraryStore = load_document(&self.path).await?;
        store.write(account.id, key, domain, state)?;
        save_document(&self.path, &store).await
    }
}

/// Remote service backed by a JSON [`RemoteStore`] document
pub struct FileRemote {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<RemoteStore, SourceError> {
        load_document(&self.path).await
    }

    pub async fn save(&self, store: &RemoteStore) -> Result<(), SourceError> {
        let _guard = self.lock.lock().await;
        save_document(&self.path, store).await
    }

    async fn apply(&self, domain: Domain, action: ArtifactAction, items: &[Artifact]) -> Result<(), SourceError> {
        let _guard = self.lock.lock().await;
        let mut store: RemoteStore = load_document(&self.path).await?;
        store.apply(domain, action, items, Utc::now())?;
        save_document(&self.path, &store).await
    }
}

#[async_trait]
impl RemoteService for FileRemote {
    fn source_name(&self) -> &str {
        "file-remote"
    }

    async fn last_activities(&self) -> Result<Activities, SourceError> {
        Ok(self.load().await?.activities)
    }

    async fn get(&self, domain: Domain, media_type: MediaType) -> Result<Vec<RemoteItem>, SourceError> {
        Ok(self.load().await?.get(domain, media_type))
    }

    async fn get_since(
        &self,
        domain: Domain,
        media_type: MediaType,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteItem>, SourceError> {
        Ok(self.load().await?.get_since(domain, media_type, since))
    }

    async fn add(&self, domain: Domain, items: &[Artifact]) -> Result<(), SourceError> {
        self.apply(domain, ArtifactAction::Add, items).await
    }

    async fn remove(&self, domain: Domain, items: &[Artifact]) -> Result<(), SourceError> {
        self.apply(domain, ArtifactAction::Remove, items).await
    }
}
