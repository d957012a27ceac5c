use chrono::{DateTime, Utc};
use media_sync_models::{ChangeRecord, DomainState, ItemKey};

use super::{Handler, HandlerConfig, Scope, StateHandler};
use crate::error::SyncError;
use crate::snapshot::Snapshot;

/// Remote items reported as touched since the stored watermark, keyed by
/// library key
#[derive(Debug, Default)]
pub struct ChangeTable {
    since: Option<DateTime<Utc>>,
    touched: Snapshot,
}

impl ChangeTable {
    pub fn new(since: Option<DateTime<Utc>>, touched: Snapshot) -> Self {
        Self { since, touched }
    }

    /// Watermark the table was fetched against; `None` means everything
    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.touched.keys()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&DomainState> {
        self.touched.get(key)
    }

    pub fn len(&self) -> usize {
        self.touched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    pub fn into_touched(self) -> Snapshot {
        self.touched
    }
}

/// Pull handler that only sees keys from a [`ChangeTable`]
///
/// Removals the remote does not report as activity are missed until the
/// next full pull.
#[derive(Debug, Clone)]
pub struct FastPullHandler {
    inner: StateHandler,
}

impl FastPullHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            inner: StateHandler::new(config),
        }
    }
}

/// Evaluate every touched key against the local snapshot
///
/// Keys the table does not list are never visited. The hook receives
/// `(visited, total)` before each key and may stop the scan by returning an
/// error, the same contract as [`crate::diff::diff_with`].
pub fn evaluate_table<F>(
    handler: &dyn Handler,
    local: &Snapshot,
    table: &ChangeTable,
    mut on_item: F,
) -> Result<Vec<ChangeRecord>, SyncError>
where
    F: FnMut(usize, usize) -> Result<(), SyncError>,
{
    let total = table.len();
    let mut records = Vec::new();
    for (visited, key) in table.keys().enumerate() {
        on_item(visited + 1, total)?;
        records.extend(handler.get_action(key, local.get(key), table.get(key)));
    }
    Ok(records)
}

impl Handler for FastPullHandler {
    fn config(&self) -> &HandlerConfig {
        self.inner.config()
    }

    fn scope(&self) -> Scope {
        Scope::Touched
    }

    fn evaluate(
        &self,
        key: &ItemKey,
        base: Option<&DomainState>,
        current: Option<&DomainState>,
    ) -> Option<ChangeRecord> {
        self.inner.evaluate(key, base, current)
    }
}
