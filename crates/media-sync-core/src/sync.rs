use chrono::{DateTime, Utc};
use futures::future::join_all;
use media_sync_config::{Config, RefreshFailurePolicy};
use media_sync_models::{
    Account, Activities, Artifact, ArtifactAction, ChangeAction, ChangeRecord, Domain, DomainState,
    ItemKey, MediaType, RemoteItem,
};
use media_sync_sources::{LocalLibrary, ProgressCallback, ProgressTracker, RemoteService};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::context::{HandlerFailure, RunContext, StopHandle, SyncStats, PROGRESS_INTERVAL};
use crate::diff::{diff_with, DiffResult};
use crate::error::SyncError;
use crate::handlers::state::properties;
use crate::handlers::{evaluate_table, ChangeTable, Handler, HandlerConfig, HandlerMode, HandlerRegistry, Scope};
use crate::resolution::{ConflictResolver, Resolution};
use crate::snapshot::Snapshot;
use crate::watermark::WatermarkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full diff, local <- remote
    Pull,
    /// Full diff, remote <- local
    Push,
    /// Only buckets the remote reports as touched, local <- remote
    FastPull,
    /// Fast pull, then push against the same primed library
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Pull => "pull",
            SyncMode::Push => "push",
            SyncMode::FastPull => "fast-pull",
            SyncMode::Full => "full",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "pull" => Some(SyncMode::Pull),
            "push" => Some(SyncMode::Push),
            "fast-pull" | "fastpull" => Some(SyncMode::FastPull),
            "full" | "sync" => Some(SyncMode::Full),
            _ => None,
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Interval,
    LibraryChange,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Manual => "manual",
            Trigger::Interval => "interval",
            Trigger::LibraryChange => "library_change",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running(SyncMode),
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Running(mode) => write!(f, "running ({})", mode),
            RunState::Completed => f.write_str("completed"),
            RunState::Failed => f.write_str("failed"),
            RunState::Aborted => f.write_str("aborted"),
        }
    }
}

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub mode: SyncMode,
    pub domains: Vec<Domain>,
    pub media_types: Vec<MediaType>,
    pub account: Account,
    pub trigger: Trigger,
    /// Evaluate everything but write nothing and keep the watermark
    pub dry_run: bool,
}

impl SyncRequest {
    /// Every domain and media type for the default account
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            domains: Domain::ALL.to_vec(),
            media_types: MediaType::ALL.to_vec(),
            account: Account::default(),
            trigger: Trigger::Manual,
            dry_run: false,
        }
    }

    pub fn with_domains(mut self, domains: impl IntoIterator<Item = Domain>) -> Self {
        self.domains = domains.into_iter().collect();
        self
    }

    pub fn with_media_types(mut self, media_types: impl IntoIterator<Item = MediaType>) -> Self {
        self.media_types = media_types.into_iter().collect();
        self
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.account = account;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enabled (domain, media type) pairs the domain supports, deduplicated
    pub fn pairs(&self) -> Vec<(Domain, MediaType)> {
        let domains: BTreeSet<Domain> = self.domains.iter().copied().collect();
        let media_types: BTreeSet<MediaType> = self.media_types.iter().copied().collect();

        let mut pairs = Vec::new();
        for domain in domains {
            for media_type in &media_types {
                if domain.media_types().contains(media_type) {
                    pairs.push((domain, *media_type));
                }
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    pub state: RunState,
    pub trigger: Trigger,
    pub mode: SyncMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The error that ended the run, or the first handler failure
    pub error: Option<SyncError>,
    pub changes: DiffResult,
    pub stats: SyncStats,
    pub failures: Vec<HandlerFailure>,
}

impl SyncResult {
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}

/// Sequences handlers for one mode and owns the run lifecycle
pub struct SyncOrchestrator {
    library: Arc<dyn LocalLibrary>,
    remote: Arc<dyn RemoteService>,
    registry: HandlerRegistry,
    resolver: ConflictResolver,
    watermark: WatermarkStore,
    refresh_failure: RefreshFailurePolicy,
    progress: Option<ProgressCallback>,
    stop: StopHandle,
    run_lock: Mutex<()>,
    state: RwLock<RunState>,
}

impl SyncOrchestrator {
    pub fn new(
        library: Arc<dyn LocalLibrary>,
        remote: Arc<dyn RemoteService>,
        registry: HandlerRegistry,
        watermark: WatermarkStore,
    ) -> Self {
        Self {
            library,
            remote,
            registry,
            resolver: ConflictResolver::default(),
            watermark,
            refresh_failure: RefreshFailurePolicy::Abort,
            progress: None,
            stop: StopHandle::new(),
            run_lock: Mutex::new(()),
            state: RwLock::new(RunState::Idle),
        }
    }

    /// Composition root: standard handlers plus configured resolution policy
    pub fn from_config(
        config: &Config,
        library: Arc<dyn LocalLibrary>,
        remote: Arc<dyn RemoteService>,
        watermark: WatermarkStore,
    ) -> Self {
        Self::new(library, remote, HandlerRegistry::standard(), watermark)
            .with_resolver(ConflictResolver::from_config(&config.resolution))
            .with_refresh_failure(config.full.on_refresh_failure())
    }

    pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_refresh_failure(mut self, policy: RefreshFailurePolicy) -> Self {
        self.refresh_failure = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Handle that stops the active run at its next checkpoint
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn cancel(&self) {
        info!("Stop requested for running sync");
        self.stop.stop();
    }

    pub fn state(&self) -> RunState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: RunState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Run one sync; rejects the call while another run holds the lock
    #[instrument(skip(self, request), fields(mode = %request.mode, trigger = %request.trigger, account = request.account.id))]
    pub async fn run(&self, request: SyncRequest) -> Result<SyncResult, SyncError> {
        let _guard = self.run_lock.try_lock().map_err(|_| {
            warn!("Sync already running, rejecting {} trigger", request.trigger);
            SyncError::AlreadyRunning
        })?;

        self.stop.reset();
        self.set_state(RunState::Running(request.mode));
        let started_at = Utc::now();
        info!(
            operation = "sync_start",
            library = self.library.source_name(),
            remote = self.remote.source_name(),
            dry_run = request.dry_run,
            "Starting {} sync",
            request.mode
        );

        let mut ctx = RunContext::new(
            request.account.clone(),
            self.stop.clone(),
            self.progress.clone(),
            request.dry_run,
        );

        let mut outcome = self.execute(&mut ctx, &request).await;
        if outcome.is_ok() {
            outcome = self.flush(&mut ctx).await;
        }
        // The watermark only moves once the run's artifacts are out
        if outcome.is_ok() {
            if let Some(next) = ctx.next_activities.take() {
                self.save_watermark(&ctx, &next);
            }
        }

        let state = match &outcome {
            Err(SyncError::Aborted) => RunState::Aborted,
            Err(_) => RunState::Failed,
            Ok(()) if !ctx.failures.is_empty() => RunState::Failed,
            Ok(()) => RunState::Completed,
        };
        let error = match outcome {
            Err(e) => Some(e),
            Ok(()) => ctx.failures.first().map(|f| f.error.clone()),
        };
        self.set_state(state);

        let result = SyncResult {
            success: state == RunState::Completed,
            state,
            trigger: request.trigger,
            mode: request.mode,
            started_at,
            finished_at: Utc::now(),
            error,
            changes: ctx.changes,
            stats: ctx.stats,
            failures: ctx.failures,
        };

        if result.success {
            info!(
                operation = "sync_complete",
                changes = result.changes.len(),
                local_writes = result.stats.local_writes,
                artifacts = result.stats.artifacts_flushed,
                "{} sync completed in {:.1}s",
                request.mode,
                result.duration().as_secs_f64()
            );
        } else {
            warn!(
                operation = "sync_complete",
                state = %result.state,
                failed_handlers = result.stats.handlers_failed,
                error = ?result.error,
                "{} sync did not complete cleanly",
                request.mode
            );
        }

        Ok(result)
    }

    async fn execute(&self, ctx: &mut RunContext, request: &SyncRequest) -> Result<(), SyncError> {
        let pairs = request.pairs();
        if pairs.is_empty() {
            warn!("No enabled domain supports the requested media types, nothing to do");
            return Ok(());
        }

        match request.mode {
            SyncMode::Pull => {
                self.prime(ctx, &pairs).await?;
                self.run_phase(ctx, &pairs, HandlerMode::Pull).await
            }
            SyncMode::Push => {
                self.prime(ctx, &pairs).await?;
                self.run_phase(ctx, &pairs, HandlerMode::Push).await
            }
            SyncMode::FastPull => {
                self.refresh(ctx).await?;
                self.prime(ctx, &pairs).await?;
                self.fast_pull_phase(ctx, &pairs).await
            }
            SyncMode::Full => {
                let refreshed = self.refresh(ctx).await;
                self.prime(ctx, &pairs).await?;
                match refreshed {
                    Ok(()) => self.fast_pull_phase(ctx, &pairs).await?,
                    Err(e) if e.stops_run() => return Err(e),
                    Err(e) => match self.refresh_failure {
                        RefreshFailurePolicy::Abort => {
                            warn!(error = %e, "Remote refresh failed, skipping push phase");
                            return Err(e);
                        }
                        RefreshFailurePolicy::Continue => {
                            warn!(error = %e, "Remote refresh failed, pushing from primed library");
                            ctx.record_failure("refresh".to_string(), e);
                        }
                    },
                }
                if ctx.has_unsettled() && self.refresh_failure == RefreshFailurePolicy::Abort {
                    warn!(
                        failed_handlers = ctx.stats.handlers_failed,
                        "Fast pull did not finish for every bucket, skipping push phase"
                    );
                    return Ok(());
                }
                self.run_phase(ctx, &pairs, HandlerMode::Push).await
            }
        }
    }

    /// Fetch remote activities and the stored watermark
    async fn refresh(&self, ctx: &mut RunContext) -> Result<(), SyncError> {
        ctx.check_stop()?;
        let activities = self.remote.last_activities().await?;
        ctx.previous_activities = self.watermark.load();
        debug!(
            buckets = activities.entries.len(),
            has_watermark = ctx.previous_activities.is_some(),
            "Refreshed remote activities"
        );
        ctx.activities = Some(activities);
        Ok(())
    }

    /// Read the library once per media type and build the lookup table
    async fn prime(&self, ctx: &mut RunContext, pairs: &[(Domain, MediaType)]) -> Result<(), SyncError> {
        let media_types: BTreeSet<MediaType> = pairs.iter().map(|(_, mt)| *mt).collect();
        ctx.check_stop()?;
        let account = &ctx.account;
        let reads = join_all(media_types.iter().map(|&media_type| async move {
            (media_type, self.library.items(account, media_type).await)
        }))
        .await;

        for (media_type, read) in reads {
            match read {
                Ok(items) => ctx.prime(media_type, items),
                Err(e) => {
                    let e = SyncError::from(e);
                    if e.stops_run() {
                        return Err(e);
                    }
                    warn!(media_type = %media_type, error = %e, "Failed to read library, skipping media type");
                    ctx.record_failure(format!("prime:{}", media_type), e);
                }
            }
        }
        ctx.build_lookup();
        Ok(())
    }

    async fn run_phase(
        &self,
        ctx: &mut RunContext,
        pairs: &[(Domain, MediaType)],
        mode: HandlerMode,
    ) -> Result<(), SyncError> {
        for &(domain, media_type) in pairs {
            ctx.check_stop()?;
            if !ctx.is_primed(media_type) {
                continue;
            }
            if mode == HandlerMode::Push && ctx.is_unsettled(domain, media_type) {
                warn!(
                    domain = %domain,
                    media_type = %media_type,
                    "Pull for this bucket did not finish, holding its push"
                );
                ctx.stats.buckets_held += 1;
                continue;
            }
            let Some(handler) = self.registry.get(domain, mode, media_type) else {
                warn!(domain = %domain, media_type = %media_type, mode = %mode, "No handler registered");
                continue;
            };
            self.run_guarded(ctx, handler).await?;
        }
        Ok(())
    }

    /// Pull only touched buckets and stage the watermark advanced for the ones
    /// that succeeded; failed buckets are marked unsettled
    async fn fast_pull_phase(&self, ctx: &mut RunContext, pairs: &[(Domain, MediaType)]) -> Result<(), SyncError> {
        let Some(activities) = ctx.activities.clone() else {
            return Ok(());
        };
        let previous = ctx.previous_activities.clone().unwrap_or_default();

        let touched: Vec<(Domain, MediaType)> = pairs
            .iter()
            .copied()
            .filter(|&(domain, media_type)| activities.touched_since(&previous, domain, media_type))
            .collect();
        if touched.is_empty() {
            info!(operation = "fast_pull", "Remote watermark unchanged, nothing to pull");
            return Ok(());
        }
        info!(operation = "fast_pull", buckets = touched.len(), "Pulling touched buckets");

        let mut next = previous.clone();
        for (domain, media_type) in touched {
            ctx.check_stop()?;
            if !ctx.is_primed(media_type) {
                continue;
            }
            let Some(handler) = self.registry.get(domain, HandlerMode::FastPull, media_type) else {
                warn!(domain = %domain, media_type = %media_type, "No fast-pull handler registered");
                continue;
            };

            let failures_before = ctx.failures.len();
            self.run_guarded(ctx, handler).await?;
            if ctx.failures.len() == failures_before {
                if let Some(at) = activities.get(domain, media_type) {
                    next.set(domain, media_type, at);
                }
            } else {
                ctx.mark_unsettled(domain, media_type);
            }
        }

        ctx.next_activities = Some(next);
        Ok(())
    }

    fn save_watermark(&self, ctx: &RunContext, next: &Activities) {
        if ctx.dry_run {
            debug!("Dry run, watermark left unchanged");
            return;
        }
        // A stale watermark only widens the next fast pull
        if let Err(e) = self.watermark.save(next) {
            warn!("Failed to save watermark: {:#}", e);
        }
    }

    /// Handler boundary: one failing pair does not stop its siblings
    async fn run_guarded(&self, ctx: &mut RunContext, handler: &dyn Handler) -> Result<(), SyncError> {
        let label = handler.config().label();
        ctx.stats.handlers_run += 1;
        match self.run_handler(ctx, handler).await {
            Ok(records) => {
                ctx.changes.extend(records);
                Ok(())
            }
            Err(e) if e.stops_run() => Err(e),
            Err(e) => {
                warn!(handler = %label, error = %e, "Handler failed, continuing with remaining handlers");
                ctx.record_failure(label, e);
                Ok(())
            }
        }
    }

    async fn run_handler(&self, ctx: &mut RunContext, handler: &dyn Handler) -> Result<Vec<ChangeRecord>, SyncError> {
        let config = *handler.config();
        let label = config.label();
        let local = ctx.local_snapshot(config.domain, config.media_type);

        let stop = ctx.stop_handle();
        let progress = ctx.progress_callback();
        let mut tracker: Option<ProgressTracker> = None;

        let (remote, records) = match handler.scope() {
            Scope::Snapshot => {
                let items = self.remote.get(config.domain, config.media_type).await?;
                let remote = self.align(ctx, &config, items);
                let (base, current) = if config.mode.writes_local() {
                    (&local, &remote)
                } else {
                    (&remote, &local)
                };

                let records = diff_with(handler, base, current, &mut ctx.pending, |visited, total| {
                    stop.check()?;
                    tracker
                        .get_or_insert_with(|| {
                            ProgressTracker::new(label.as_str(), total, PROGRESS_INTERVAL)
                                .with_callback(progress.clone())
                        })
                        .tick(visited);
                    Ok(())
                })?;
                (remote, records)
            }
            Scope::Touched => {
                let since = ctx
                    .previous_activities
                    .as_ref()
                    .and_then(|previous| previous.get(config.domain, config.media_type));
                let items = self
                    .remote
                    .get_since(config.domain, config.media_type, since)
                    .await?;
                let table = ChangeTable::new(since, self.align(ctx, &config, items));
                debug!(handler = %label, touched = table.len(), since = ?table.since(), "Built change table");

                let mut fast_tracker = ctx.tracker(&label, table.len());
                let records = evaluate_table(handler, &local, &table, |visited, _| {
                    stop.check()?;
                    fast_tracker.tick(visited);
                    Ok(())
                })?;
                tracker = Some(fast_tracker);
                (table.into_touched(), records)
            }
        };

        let evaluated = tracker.as_ref().map(|t| t.total()).unwrap_or(0);
        let unchanged = evaluated.saturating_sub(records.len());
        ctx.stats.items_evaluated += evaluated;
        ctx.stats.unchanged += unchanged;
        if let Some(tracker) = tracker.as_mut() {
            tracker.record_unchanged(unchanged);
        }

        let applied = self
            .apply_records(ctx, &config, &local, &remote, records, tracker.as_mut())
            .await?;
        if let Some(tracker) = tracker {
            tracker.log_summary();
        }
        Ok(applied)
    }

    fn align(&self, ctx: &mut RunContext, config: &HandlerConfig, items: Vec<RemoteItem>) -> Snapshot {
        let alignment = ctx.lookup.align(config.domain, config.media_type, items);
        ctx.stats.unmatched += alignment.unmatched;
        ctx.stats.invalid += alignment.invalid;
        if alignment.unmatched > 0 || alignment.invalid > 0 {
            debug!(
                handler = %config.label(),
                unmatched = alignment.unmatched,
                invalid = alignment.invalid,
                "Dropped remote items that could not be keyed"
            );
        }
        alignment.snapshot
    }

    /// Turn records into local writes or queued artifacts
    ///
    /// Returns the records that were acted on, retargeted at the winning side
    /// when a conflict was arbitrated. In pull modes a key is settled for the
    /// rest of the run once it is written or skipped by a data error, so the
    /// push phase never sends the opposite mutation.
    async fn apply_records(
        &self,
        ctx: &mut RunContext,
        config: &HandlerConfig,
        local: &Snapshot,
        remote: &Snapshot,
        records: Vec<ChangeRecord>,
        mut tracker: Option<&mut ProgressTracker>,
    ) -> Result<Vec<ChangeRecord>, SyncError> {
        let mut applied = Vec::with_capacity(records.len());

        for mut record in records {
            ctx.check_stop()?;

            if config.mode == HandlerMode::Push && ctx.is_reconciled(config.domain, &record.key) {
                ctx.stats.already_reconciled += 1;
                continue;
            }

            let resolution = if record.action == ChangeAction::Changed && self.resolver.applies(config.domain) {
                match (local.get(&record.key), remote.get(&record.key)) {
                    (Some(local_state), Some(remote_state)) => Some(self.resolver.resolve(local_state, remote_state)),
                    _ => None,
                }
            } else {
                None
            };

            let outcome = match resolution {
                Some(Resolution::Unchanged) => {
                    ctx.stats.unchanged += 1;
                    if let Some(tracker) = tracker.as_deref_mut() {
                        tracker.record_unchanged(1);
                    }
                    if config.mode.writes_local() {
                        ctx.mark_reconciled(config.domain, &record.key);
                    }
                    continue;
                }
                Some(Resolution::WriteLocal(state)) => {
                    ctx.stats.conflicts_resolved += 1;
                    record.properties = properties(local.get(&record.key), Some(&state));
                    record.target = Some(state.clone());
                    self.write_local(ctx, config, &record.key, Some(&state)).await
                }
                Some(Resolution::SendRemote(state)) => {
                    ctx.stats.conflicts_resolved += 1;
                    record.properties = properties(remote.get(&record.key), Some(&state));
                    record.target = Some(state.clone());
                    self.queue_artifact(ctx, config, &record.key, ArtifactAction::Add, Some(state))
                }
                None if config.mode.writes_local() => {
                    self.write_local(ctx, config, &record.key, record.target.as_ref()).await
                }
                None => {
                    let (action, state) = match record.action {
                        ChangeAction::Removed => (ArtifactAction::Remove, None),
                        ChangeAction::Added | ChangeAction::Changed => (ArtifactAction::Add, record.target.clone()),
                    };
                    self.queue_artifact(ctx, config, &record.key, action, state)
                }
            };

            match outcome {
                Ok(()) => {
                    match record.action {
                        ChangeAction::Added => ctx.stats.added += 1,
                        ChangeAction::Removed => ctx.stats.removed += 1,
                        ChangeAction::Changed => ctx.stats.changed += 1,
                    }
                    if let Some(tracker) = tracker.as_deref_mut() {
                        match record.action {
                            ChangeAction::Added => tracker.record_added(),
                            ChangeAction::Removed => tracker.record_removed(),
                            ChangeAction::Changed => tracker.record_changed(),
                        }
                    }
                    if config.mode.writes_local() {
                        ctx.mark_reconciled(config.domain, &record.key);
                    }
                    applied.push(record);
                }
                Err(SyncError::Data(reason)) => {
                    warn!(
                        handler = %config.label(),
                        key = %record.key,
                        "Skipping item: {}",
                        reason
                    );
                    ctx.stats.skipped += 1;
                    if let Some(tracker) = tracker.as_deref_mut() {
                        tracker.record_skipped();
                    }
                    if config.mode.writes_local() {
                        ctx.mark_reconciled(config.domain, &record.key);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(applied)
    }

    async fn write_local(
        &self,
        ctx: &mut RunContext,
        config: &HandlerConfig,
        key: &ItemKey,
        state: Option<&DomainState>,
    ) -> Result<(), SyncError> {
        if ctx.dry_run {
            debug!(domain = %config.domain, key = %key, "Dry run, skipping local write");
            return Ok(());
        }
        self.library.write(&ctx.account, key, config.domain, state).await?;
        ctx.stats.local_writes += 1;
        Ok(())
    }

    fn queue_artifact(
        &self,
        ctx: &mut RunContext,
        config: &HandlerConfig,
        key: &ItemKey,
        action: ArtifactAction,
        state: Option<DomainState>,
    ) -> Result<(), SyncError> {
        let ids = ctx
            .lookup
            .ids(key)
            .cloned()
            .ok_or_else(|| SyncError::Data(format!("no identifiers known for {}", key)))?;
        ctx.queue.add(Artifact {
            key: key.clone(),
            ids,
            media_type: config.media_type,
            domain: config.domain,
            action,
            state,
        });
        Ok(())
    }

    /// Send the run's artifacts in one batch, unless this is a dry run
    async fn flush(&self, ctx: &mut RunContext) -> Result<(), SyncError> {
        let queue = ctx.take_queue();
        ctx.stats.artifacts_queued = queue.len();
        if ctx.dry_run {
            if !queue.is_empty() {
                info!(artifacts = queue.len(), "Dry run, not sending outbound artifacts");
            }
            return Ok(());
        }
        ctx.stats.artifacts_flushed = queue.flush(self.remote.as_ref()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
