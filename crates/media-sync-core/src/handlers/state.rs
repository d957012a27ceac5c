use media_sync_models::{
    ChangeAction, ChangeRecord, DomainState, FieldChange, ItemKey, Presence,
};
use std::collections::BTreeMap;

use super::{Handler, HandlerConfig};

/// Presence-based handler shared by every domain
///
/// Domain differences live in [`DomainState`]: what counts as present, which
/// fields are tracked and which are only carried for audit.
#[derive(Debug, Clone)]
pub struct StateHandler {
    config: HandlerConfig,
}

impl StateHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    fn record(
        &self,
        key: &ItemKey,
        action: ChangeAction,
        base: Option<&DomainState>,
        current: Option<&DomainState>,
        target: Option<DomainState>,
    ) -> ChangeRecord {
        ChangeRecord::new(
            key.clone(),
            self.config.domain,
            self.config.media_type,
            action,
            target,
        )
        .with_properties(properties(base, current))
    }

    /// Key only on the current side
    pub fn on_added(&self, key: &ItemKey, current: &DomainState) -> Option<ChangeRecord> {
        match current.presence() {
            Presence::Positive => Some(self.record(
                key,
                ChangeAction::Added,
                None,
                Some(current),
                Some(current.clone()),
            )),
            // An explicit negative is an absence on the other side
            Presence::Negative => Some(self.record(
                key,
                ChangeAction::Removed,
                None,
                Some(current),
                Some(current.clone()),
            )),
            Presence::Unknown => None,
        }
    }

    /// Key only on the base side
    pub fn on_removed(&self, key: &ItemKey, base: &DomainState) -> Option<ChangeRecord> {
        match base.presence() {
            Presence::Positive => Some(self.record(key, ChangeAction::Removed, Some(base), None, None)),
            Presence::Negative | Presence::Unknown => None,
        }
    }

    /// Key on both sides
    pub fn on_common(
        &self,
        key: &ItemKey,
        base: &DomainState,
        current: &DomainState,
    ) -> Option<ChangeRecord> {
        match (base.presence(), current.presence()) {
            (Presence::Unknown, _) => self.on_added(key, current),
            (_, Presence::Unknown) => self.on_removed(key, base),
            (Presence::Positive, Presence::Negative) => Some(self.record(
                key,
                ChangeAction::Removed,
                Some(base),
                Some(current),
                Some(current.clone()),
            )),
            (Presence::Negative, Presence::Positive) => Some(self.record(
                key,
                ChangeAction::Added,
                Some(base),
                Some(current),
                Some(current.clone()),
            )),
            (Presence::Positive, Presence::Positive)
                if base.tracked_fields() != current.tracked_fields() =>
            {
                Some(self.record(
                    key,
                    ChangeAction::Changed,
                    Some(base),
                    Some(current),
                    Some(current.clone()),
                ))
            }
            _ => None,
        }
    }
}

impl Handler for StateHandler {
    fn config(&self) -> &HandlerConfig {
        &self.config
    }

    fn evaluate(
        &self,
        key: &ItemKey,
        base: Option<&DomainState>,
        current: Option<&DomainState>,
    ) -> Option<ChangeRecord> {
        match (base, current) {
            (None, None) => None,
            (None, Some(current)) => self.on_added(key, current),
            (Some(base), None) => self.on_removed(key, base),
            (Some(base), Some(current)) => self.on_common(key, base, current),
        }
    }
}

/// Field-level before/after of one state or a (base, current) pair
///
/// Only fields whose value differs are reported.
pub fn properties(
    base: Option<&DomainState>,
    current: Option<&DomainState>,
) -> BTreeMap<String, FieldChange> {
    let old = base.map(|s| s.properties()).unwrap_or_default();
    let new = current.map(|s| s.properties()).unwrap_or_default();

    let mut changes = BTreeMap::new();
    for name in old.keys().chain(new.keys()) {
        if changes.contains_key(name) {
            continue;
        }
        let before = old.get(name).cloned();
        let after = new.get(name).cloned();
        if before != after {
            changes.insert(name.clone(), FieldChange { old: before, new: after });
        }
    }
    changes
}
