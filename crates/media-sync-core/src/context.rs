use media_sync_models::{Account, Activities, Domain, ItemKey, LibraryItem, MediaType};
use media_sync_sources::{ProgressCallback, ProgressTracker};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::diff::DiffResult;
use crate::error::SyncError;
use crate::id_matching::IdIndex;
use crate::pending::Pending;
use crate::queue::ActionQueue;
use crate::snapshot::Snapshot;

/// Log item-loop progress every N items
pub(crate) const PROGRESS_INTERVAL: usize = 100;

/// Cooperative cancellation flag shared with whoever may stop a run
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn check(&self) -> Result<(), SyncError> {
        if self.is_stopped() {
            Err(SyncError::Aborted)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncStats {
    pub handlers_run: usize,
    pub handlers_failed: usize,
    pub items_evaluated: usize,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub local_writes: usize,
    pub artifacts_queued: usize,
    pub artifacts_flushed: usize,
    pub conflicts_resolved: usize,
    /// Evaluated keys that needed no action
    pub unchanged: usize,
    /// Keys dropped by a per-item data error
    pub skipped: usize,
    /// Remote items matching no library item
    pub unmatched: usize,
    /// Remote items with an out-of-range state
    pub invalid: usize,
    /// Push keys left alone because the pull phase already reconciled or
    /// held them
    pub already_reconciled: usize,
    /// Push buckets left alone because their pull did not finish
    pub buckets_held: usize,
}

/// One handler that failed while its siblings kept going
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: SyncError,
}

/// Everything one run owns
pub struct RunContext {
    pub account: Account,
    pub dry_run: bool,
    stop: StopHandle,
    progress: Option<ProgressCallback>,
    library: HashMap<MediaType, Vec<LibraryItem>>,
    pub lookup: IdIndex,
    pub pending: Pending,
    pub queue: ActionQueue,
    reconciled: HashSet<(Domain, ItemKey)>,
    unsettled: HashSet<(Domain, MediaType)>,
    /// Watermark stored by the previous run
    pub previous_activities: Option<Activities>,
    /// Watermark reported by the remote at the start of this run
    pub activities: Option<Activities>,
    /// Watermark to store once this run's artifacts have been flushed
    pub next_activities: Option<Activities>,
    pub changes: DiffResult,
    pub stats: SyncStats,
    pub failures: Vec<HandlerFailure>,
}

impl RunContext {
    pub fn new(account: Account, stop: StopHandle, progress: Option<ProgressCallback>, dry_run: bool) -> Self {
        Self {
            account,
            dry_run,
            stop,
            progress,
            library: HashMap::new(),
            lookup: IdIndex::default(),
            pending: Pending::new(),
            queue: ActionQueue::new(),
            reconciled: HashSet::new(),
            unsettled: HashSet::new(),
            previous_activities: None,
            activities: None,
            next_activities: None,
            changes: DiffResult::new(),
            stats: SyncStats::default(),
            failures: Vec::new(),
        }
    }

    pub fn check_stop(&self) -> Result<(), SyncError> {
        self.stop.check()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn progress_callback(&self) -> Option<ProgressCallback> {
        self.progress.clone()
    }

    /// Store one media type of the library; read-only afterwards
    pub fn prime(&mut self, media_type: MediaType, items: Vec<LibraryItem>) {
        debug!("Primed {} {} library items", items.len(), media_type);
        self.library.insert(media_type, items);
    }

    pub fn is_primed(&self, media_type: MediaType) -> bool {
        self.library.contains_key(&media_type)
    }

    /// Build the identifier lookup table over everything primed
    pub fn build_lookup(&mut self) {
        self.lookup = IdIndex::build(self.library.values().flatten());
        if self.lookup.collisions() > 0 {
            debug!(
                "Lookup table built over {} items with {} identifier collisions",
                self.lookup.len(),
                self.lookup.collisions()
            );
        }
    }

    pub fn local_snapshot(&self, domain: Domain, media_type: MediaType) -> Snapshot {
        self.library
            .get(&media_type)
            .map(|items| Snapshot::from_library(items, domain))
            .unwrap_or_default()
    }

    pub fn mark_reconciled(&mut self, domain: Domain, key: &ItemKey) {
        self.reconciled.insert((domain, key.clone()));
    }

    pub fn is_reconciled(&self, domain: Domain, key: &ItemKey) -> bool {
        self.reconciled.contains(&(domain, key.clone()))
    }

    /// Record a bucket whose pull failed; the primed library is stale for it
    pub fn mark_unsettled(&mut self, domain: Domain, media_type: MediaType) {
        self.unsettled.insert((domain, media_type));
    }

    pub fn is_unsettled(&self, domain: Domain, media_type: MediaType) -> bool {
        self.unsettled.contains(&(domain, media_type))
    }

    pub fn has_unsettled(&self) -> bool {
        !self.unsettled.is_empty()
    }

    pub fn tracker(&self, label: &str, total: usize) -> ProgressTracker {
        ProgressTracker::new(label, total, PROGRESS_INTERVAL).with_callback(self.progress.clone())
    }

    pub fn record_failure(&mut self, handler: String, error: SyncError) {
        self.stats.handlers_failed += 1;
        self.failures.push(HandlerFailure { handler, error });
    }

    /// Hand the queue to the flush step
    pub fn take_queue(&mut self) -> ActionQueue {
        std::mem::take(&mut self.queue)
    }
}
