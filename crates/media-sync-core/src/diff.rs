// Diff computation between two snapshots of one bucket

use media_sync_models::{ChangeAction, ChangeRecord, Domain, ItemKey};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::SyncError;
use crate::handlers::Handler;
use crate::pending::Pending;
use crate::snapshot::Snapshot;

/// Compare two snapshots of the handler's (domain, media type)
///
/// Keys only in `current` go to `on_added`, keys only in `base` to
/// `on_removed` and shared keys to `on_common`, each exactly once.
pub fn diff(handler: &dyn Handler, base: &Snapshot, current: &Snapshot) -> Result<Vec<ChangeRecord>, SyncError> {
    let mut pending = Pending::new();
    diff_with(handler, base, current, &mut pending, |_, _| Ok(()))
}

/// [`diff`] with a caller-owned pending set and a per-item hook
///
/// The pending set for the handler's media type is seeded with the base keys
/// and shrinks as current keys match; whatever is left are removals. The hook
/// receives `(visited, total)` before each key and may stop the scan by
/// returning an error. Output follows current order, then leftover base keys
/// in base order.
pub fn diff_with<F>(
    handler: &dyn Handler,
    base: &Snapshot,
    current: &Snapshot,
    pending: &mut Pending,
    mut on_item: F,
) -> Result<Vec<ChangeRecord>, SyncError>
where
    F: FnMut(usize, usize) -> Result<(), SyncError>,
{
    let media_type = handler.config().media_type;
    pending.seed(media_type, base.keys());

    let total = current.len() + base.keys().filter(|k| !current.contains(k)).count();
    let mut visited = 0;
    let mut records = Vec::new();

    for (key, state) in current.iter() {
        visited += 1;
        on_item(visited, total)?;

        let record = if pending.remove(media_type, key) {
            handler.evaluate(key, base.get(key), Some(state))
        } else {
            handler.evaluate(key, None, Some(state))
        };
        records.extend(record);
    }

    for key in pending.take_remaining(media_type) {
        visited += 1;
        on_item(visited, total)?;
        records.extend(handler.evaluate(&key, base.get(&key), None));
    }

    debug!(
        handler = %handler.config().label(),
        base = base.len(),
        current = current.len(),
        changes = records.len(),
        "Diff complete"
    );

    Ok(records)
}

/// Change records of one run grouped by domain
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DiffResult {
    pub domains: BTreeMap<Domain, Vec<ChangeRecord>>,
}

impl DiffResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ChangeRecord>) {
        for record in records {
            self.domains.entry(record.domain).or_default().push(record);
        }
    }

    pub fn records(&self, domain: Domain) -> &[ChangeRecord] {
        self.domains.get(&domain).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn find(&self, domain: Domain, key: &ItemKey) -> Option<&ChangeRecord> {
        self.records(domain).iter().find(|r| &r.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.domains.values().flatten()
    }

    pub fn count(&self, action: ChangeAction) -> usize {
        self.iter().filter(|r| r.action == action).count()
    }

    pub fn len(&self) -> usize {
        self.domains.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
