pub mod clear;
pub mod config;
pub mod sync;
pub mod sync_ui;

use media_sync_config::{Config, PathManager};
use media_sync_core::{SyncOrchestrator, WatermarkStore};
use media_sync_sources::{FileLibrary, FileRemote};
use std::sync::Arc;
use tracing::debug;

/// Wire the JSON-backed library and remote into an orchestrator
pub fn build_orchestrator(config: &Config, paths: &PathManager, account_id: u32) -> SyncOrchestrator {
    let library_path = config
        .sources
        .library_path
        .clone()
        .unwrap_or_else(|| paths.default_library_file());
    let remote_path = config
        .sources
        .remote_path
        .clone()
        .unwrap_or_else(|| paths.default_remote_file());
    debug!(
        library = %library_path.display(),
        remote = %remote_path.display(),
        "Using file-backed sources"
    );

    SyncOrchestrator::from_config(
        config,
        Arc::new(FileLibrary::new(library_path)),
        Arc::new(FileRemote::new(remote_path)),
        WatermarkStore::for_account(paths, account_id),
    )
}
