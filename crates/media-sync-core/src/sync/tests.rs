use super::*;
use async_trait::async_trait;
use chrono::TimeZone;
use media_sync_models::{FieldValue, LibraryItem, ListMembership, Lists, MediaIds, Rating, Watched};
use media_sync_sources::{InMemoryLibrary, InMemoryRemote, LibraryStore, RemoteStore, SourceError};
use tempfile::TempDir;
use tokio::sync::Notify;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, day, 9, 0, 0).unwrap()
}

fn movie(key: &str, imdb: &str) -> LibraryItem {
    LibraryItem::new(key, MediaIds::new().with_imdb(imdb), MediaType::Movie)
}

fn rating(value: u8, day: u32) -> DomainState {
    DomainState::Rating(Rating::new(value, Some(at(day))))
}

fn watched(day: u32) -> DomainState {
    DomainState::Watched(Watched::watched(Some(at(day))))
}

fn lists(ids: &[&str]) -> DomainState {
    DomainState::List(ids.iter().map(|id| ListMembership::new(*id, None)).collect::<Lists>())
}

fn remote_item(imdb: &str, state: DomainState) -> RemoteItem {
    RemoteItem::new(MediaIds::new().with_imdb(imdb), MediaType::Movie, state)
}

struct Harness {
    dir: TempDir,
    library: Arc<InMemoryLibrary>,
    remote: Arc<InMemoryRemote>,
}

impl Harness {
    fn new(library: LibraryStore, remote: RemoteStore) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            library: Arc::new(InMemoryLibrary::new(library)),
            remote: Arc::new(InMemoryRemote::new(remote)),
        }
    }

    fn watermark(&self) -> WatermarkStore {
        WatermarkStore::new(self.dir.path().join("last_activities_1.json"))
    }

    fn orchestrator(&self) -> SyncOrchestrator {
        SyncOrchestrator::new(
            self.library.clone(),
            self.remote.clone(),
            HandlerRegistry::standard(),
            self.watermark(),
        )
    }
}

fn request(mode: SyncMode, domains: &[Domain]) -> SyncRequest {
    SyncRequest::new(mode)
        .with_domains(domains.iter().copied())
        .with_media_types([MediaType::Movie])
}

#[tokio::test]
async fn test_pull_newer_remote_rating_wins() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(8, 1))),
        RemoteStore::new().with_item(remote_item("tt1", rating(9, 2)), at(2)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.stats.conflicts_resolved, 1);
    let writes = harness.library.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].state, Some(rating(9, 2)));
    assert!(harness.remote.submitted().await.is_empty());
}

#[tokio::test]
async fn test_pull_newer_local_rating_is_sent_back() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(9, 5))),
        RemoteStore::new().with_item(remote_item("tt1", rating(6, 1)), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(result.success);
    assert!(harness.library.writes().await.is_empty());
    let submitted = harness.remote.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].artifacts[0].state, Some(rating(9, 5)));
    assert_eq!(result.stats.artifacts_flushed, 1);
}

#[tokio::test]
async fn test_local_winner_is_reported_as_the_value_sent() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(9, 5))),
        RemoteStore::new().with_item(remote_item("tt1", rating(6, 1)), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings]))
        .await
        .unwrap();

    let record = result.changes.find(Domain::Ratings, &ItemKey::from("101")).unwrap();
    assert_eq!(record.target, Some(rating(9, 5)));
    let value = &record.properties["value"];
    assert_eq!(value.old, Some(FieldValue::Int(6)));
    assert_eq!(value.new, Some(FieldValue::Int(9)));
}

#[tokio::test]
async fn test_unchanged_items_are_counted() {
    let harness = Harness::new(
        LibraryStore::new()
            .with_item(1, movie("101", "tt1").with_state(rating(8, 1)))
            .with_item(1, movie("102", "tt2").with_state(rating(5, 1))),
        RemoteStore::new()
            .with_item(remote_item("tt1", rating(8, 1)), at(1))
            .with_item(remote_item("tt2", rating(7, 2)), at(2)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stats.items_evaluated, 2);
    assert_eq!(result.stats.unchanged, 1);
    assert_eq!(result.stats.changed, 1);
}

#[tokio::test]
async fn test_pull_keeps_every_list_membership() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(lists(&["watchlist"]))),
        RemoteStore::new().with_item(remote_item("tt1", lists(&["watchlist", "favourites"])), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Watchlist]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stats.changed, 1);
    let library = harness.library.snapshot().await;
    let item = library.item(1, &ItemKey::from("101")).unwrap();
    let Some(DomainState::List(memberships)) = item.state(Domain::Watchlist) else {
        panic!("list state missing after pull");
    };
    assert_eq!(memberships.list_ids(), vec!["favourites", "watchlist"]);
}

#[tokio::test]
async fn test_push_sends_custom_list_membership() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(lists(&["watchlist", "to-rewatch"]))),
        RemoteStore::new().with_item(remote_item("tt1", lists(&["watchlist"])), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Push, &[Domain::Watchlist]))
        .await
        .unwrap();

    assert!(result.success);
    let remote = harness.remote.snapshot().await.get(Domain::Watchlist, MediaType::Movie);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].state, lists(&["to-rewatch", "watchlist"]));
}

#[tokio::test]
async fn test_pull_clears_ratings_missing_remotely() {
    let harness = Harness::new(
        LibraryStore::new()
            .with_item(1, movie("101", "tt1").with_state(rating(8, 1)))
            .with_item(1, movie("102", "tt2").with_state(rating(5, 1))),
        RemoteStore::new().with_item(remote_item("tt1", rating(8, 1)), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert_eq!(result.stats.removed, 1);
    let library = harness.library.snapshot().await;
    let cleared = library.item(1, &ItemKey::from("102")).unwrap();
    assert!(cleared.state(Domain::Ratings).is_none());
}

#[tokio::test]
async fn test_push_submits_one_batch() {
    let harness = Harness::new(
        LibraryStore::new()
            .with_item(1, movie("102", "tt2").with_state(rating(7, 1)))
            .with_item(1, movie("103", "tt3")),
        RemoteStore::new().with_item(remote_item("tt3", rating(4, 1)), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Push, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(result.success);
    let submitted = harness.remote.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].len(), 2);
    assert!(harness.library.writes().await.is_empty());

    let remote = harness.remote.snapshot().await.get(Domain::Ratings, MediaType::Movie);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].ids.imdb_id.as_deref(), Some("tt2"));
}

#[tokio::test]
async fn test_fast_pull_with_unchanged_watermark_does_nothing() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(8, 1))),
        RemoteStore::new().with_item(remote_item("tt1", rating(3, 1)), at(1)),
    );
    let activities = harness.remote.snapshot().await.activities;
    harness.watermark().save(&activities).unwrap();
    // Any handler that ran would hit this
    harness.remote.fail_reads_for(Domain::Ratings, MediaType::Movie).await;

    let result = harness
        .orchestrator()
        .run(SyncRequest::new(SyncMode::FastPull))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stats.handlers_run, 0);
    assert!(result.changes.is_empty());
    assert!(harness.library.writes().await.is_empty());
}

#[tokio::test]
async fn test_fast_pull_only_runs_touched_buckets() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(8, 1))),
        RemoteStore::new()
            .with_item(remote_item("tt1", rating(9, 3)), at(3))
            .with_item(remote_item("tt1", watched(1)), at(1)),
    );
    let previous = Activities::new()
        .with(Domain::Ratings, MediaType::Movie, at(1))
        .with(Domain::Watched, MediaType::Movie, at(1));
    harness.watermark().save(&previous).unwrap();

    let result = harness
        .orchestrator()
        .run(request(SyncMode::FastPull, &[Domain::Ratings, Domain::Watched]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stats.handlers_run, 1);
    assert_eq!(result.changes.records(Domain::Ratings).len(), 1);
    assert!(result.changes.records(Domain::Watched).is_empty());

    let saved = harness.watermark().load().unwrap();
    assert_eq!(saved.get(Domain::Ratings, MediaType::Movie), Some(at(3)));
    assert_eq!(saved.get(Domain::Watched, MediaType::Movie), Some(at(1)));
}

#[tokio::test]
async fn test_fast_pull_without_watermark_fetches_everything() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1")),
        RemoteStore::new().with_item(remote_item("tt1", watched(2)), at(2)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::FastPull, &[Domain::Watched, Domain::Ratings]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stats.handlers_run, 1);
    assert_eq!(result.stats.added, 1);
    assert!(harness.watermark().load().is_some());
}

#[tokio::test]
async fn test_fast_pull_keeps_watermark_until_flush_succeeds() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(9, 5))),
        RemoteStore::new().with_item(remote_item("tt1", rating(6, 2)), at(2)),
    );
    harness.remote.fail_submit(true);

    let failed = harness
        .orchestrator()
        .run(request(SyncMode::FastPull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert_eq!(failed.state, RunState::Failed);
    assert!(harness.watermark().load().is_none());

    harness.remote.fail_submit(false);
    let retried = harness
        .orchestrator()
        .run(request(SyncMode::FastPull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(retried.success);
    assert_eq!(retried.stats.artifacts_flushed, 1);
    let remote = harness.remote.snapshot().await.get(Domain::Ratings, MediaType::Movie);
    assert_eq!(remote[0].state, rating(9, 5));
    assert!(harness.watermark().load().is_some());
}

fn full_fixture() -> Harness {
    Harness::new(
        LibraryStore::new()
            .with_item(1, movie("101", "tt1").with_state(rating(8, 1)))
            .with_item(1, movie("102", "tt2").with_state(watched(2))),
        RemoteStore::new().with_item(remote_item("tt1", rating(9, 3)), at(3)),
    )
}

#[tokio::test]
async fn test_full_pulls_then_pushes_without_echo() {
    let harness = full_fixture();

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Full, &[Domain::Ratings, Domain::Watched]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(harness.library.writes().await.len(), 1);
    assert_eq!(result.stats.already_reconciled, 1);

    let submitted = harness.remote.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].len(), 1);
    assert_eq!(submitted[0].artifacts[0].domain, Domain::Watched);
    assert_eq!(submitted[0].artifacts[0].key, ItemKey::from("102"));

    let saved = harness.watermark().load().unwrap();
    assert_eq!(saved.get(Domain::Ratings, MediaType::Movie), Some(at(3)));
}

#[tokio::test]
async fn test_full_refresh_failure_aborts_push_by_default() {
    let harness = full_fixture();
    harness.remote.fail_activities(true);

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Full, &[Domain::Ratings, Domain::Watched]))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.state, RunState::Failed);
    assert!(matches!(result.error, Some(SyncError::TransientIo(_))));
    assert!(harness.remote.submitted().await.is_empty());
}

#[tokio::test]
async fn test_full_refresh_failure_can_continue_with_push() {
    let harness = full_fixture();
    harness.remote.fail_activities(true);

    let result = harness
        .orchestrator()
        .with_refresh_failure(RefreshFailurePolicy::Continue)
        .run(request(SyncMode::Full, &[Domain::Ratings, Domain::Watched]))
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.failures[0].handler, "refresh");
    let submitted = harness.remote.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].artifacts[0].domain, Domain::Watched);
}

fn remote_only_watched_fixture() -> Harness {
    Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1").with_state(rating(8, 1))),
        RemoteStore::new().with_item(remote_item("tt1", watched(2)), at(2)),
    )
}

#[tokio::test]
async fn test_full_skips_push_when_a_fast_pull_bucket_fails() {
    let harness = remote_only_watched_fixture();
    harness
        .remote
        .fail_incremental_reads_for(Domain::Watched, MediaType::Movie)
        .await;

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Full, &[Domain::Watched, Domain::Ratings]))
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].handler, "fast_pull:watched:movie");
    assert!(harness.remote.submitted().await.is_empty());
    let remote = harness.remote.snapshot().await.get(Domain::Watched, MediaType::Movie);
    assert_eq!(remote.len(), 1);
    let saved = harness.watermark().load().unwrap_or_default();
    assert_eq!(saved.get(Domain::Watched, MediaType::Movie), None);
}

#[tokio::test]
async fn test_full_continue_holds_only_the_failed_bucket() {
    let harness = remote_only_watched_fixture();
    harness
        .remote
        .fail_incremental_reads_for(Domain::Watched, MediaType::Movie)
        .await;

    let result = harness
        .orchestrator()
        .with_refresh_failure(RefreshFailurePolicy::Continue)
        .run(request(SyncMode::Full, &[Domain::Watched, Domain::Ratings]))
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.stats.buckets_held, 1);
    let submitted = harness.remote.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].len(), 1);
    assert_eq!(submitted[0].artifacts[0].domain, Domain::Ratings);
    let remote = harness.remote.snapshot().await.get(Domain::Watched, MediaType::Movie);
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_rejected_local_write_is_not_pushed_back_as_removal() {
    let harness = remote_only_watched_fixture();
    harness.library.reject_writes(true);

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Full, &[Domain::Watched]))
        .await
        .unwrap();

    assert_eq!(result.stats.skipped, 1);
    assert_eq!(result.stats.already_reconciled, 1);
    assert!(harness.remote.submitted().await.is_empty());
    let remote = harness.remote.snapshot().await.get(Domain::Watched, MediaType::Movie);
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_stop_aborts_without_flushing() {
    let harness = Harness::new(
        LibraryStore::new()
            .with_item(1, movie("101", "tt1").with_state(rating(5, 1)))
            .with_item(1, movie("102", "tt2").with_state(rating(6, 1))),
        RemoteStore::new(),
    );
    let orchestrator = harness.orchestrator();
    let handle = orchestrator.stop_handle();
    let orchestrator = orchestrator.with_progress(Arc::new(move |_: &media_sync_sources::ProgressUpdate| handle.stop()));

    let result = orchestrator
        .run(request(SyncMode::Push, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.state, RunState::Aborted);
    assert_eq!(result.error, Some(SyncError::Aborted));
    assert_eq!(orchestrator.state(), RunState::Aborted);
    assert!(harness.remote.submitted().await.is_empty());
}

#[tokio::test]
async fn test_failing_handler_does_not_stop_siblings() {
    let harness = Harness::new(
        LibraryStore::new()
            .with_item(1, movie("101", "tt1").with_state(rating(8, 1)))
            .with_item(1, movie("102", "tt2")),
        RemoteStore::new().with_item(remote_item("tt2", watched(1)), at(1)),
    );
    harness.remote.fail_reads_for(Domain::Ratings, MediaType::Movie).await;

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings, Domain::Watched]))
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].handler, "pull:ratings:movie");
    assert_eq!(result.stats.handlers_run, 2);
    assert_eq!(harness.library.writes().await.len(), 1);
}

#[tokio::test]
async fn test_flush_failure_fails_run_but_keeps_local_writes() {
    let harness = full_fixture();
    harness.remote.fail_submit(true);

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Full, &[Domain::Ratings, Domain::Watched]))
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Failed);
    assert!(matches!(result.error, Some(SyncError::TransientIo(_))));
    assert_eq!(harness.library.writes().await.len(), 1);
    assert_eq!(result.stats.artifacts_flushed, 0);
    assert!(harness.watermark().load().is_none());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let harness = full_fixture();

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Full, &[Domain::Ratings, Domain::Watched]).dry_run(true))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.changes.len(), 2);
    assert_eq!(result.stats.artifacts_queued, 1);
    assert!(harness.library.writes().await.is_empty());
    assert!(harness.remote.submitted().await.is_empty());
    assert!(harness.watermark().load().is_none());
}

#[tokio::test]
async fn test_unmatched_remote_items_are_counted() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1")),
        RemoteStore::new()
            .with_item(remote_item("tt1", rating(7, 1)), at(1))
            .with_item(remote_item("tt404", rating(2, 1)), at(1)),
    );

    let result = harness
        .orchestrator()
        .run(request(SyncMode::Pull, &[Domain::Ratings]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stats.unmatched, 1);
    assert_eq!(result.stats.added, 1);
}

struct GatedLibrary {
    inner: InMemoryLibrary,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl LocalLibrary for GatedLibrary {
    fn source_name(&self) -> &str {
        "gated"
    }

    async fn items(&self, account: &Account, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.items(account, media_type).await
    }

    async fn write(
        &self,
        account: &Account,
        key: &ItemKey,
        domain: Domain,
        state: Option<&DomainState>,
    ) -> Result<(), SourceError> {
        self.inner.write(account, key, domain, state).await
    }
}

#[tokio::test]
async fn test_overlapping_run_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let library = Arc::new(GatedLibrary {
        inner: InMemoryLibrary::new(LibraryStore::new().with_item(1, movie("101", "tt1"))),
        entered: entered.clone(),
        release: release.clone(),
    });
    let orchestrator = Arc::new(SyncOrchestrator::new(
        library,
        Arc::new(InMemoryRemote::new(RemoteStore::new())),
        HandlerRegistry::standard(),
        WatermarkStore::new(dir.path().join("last_activities_1.json")),
    ));

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(request(SyncMode::Pull, &[Domain::Ratings])).await })
    };
    entered.notified().await;
    assert_eq!(orchestrator.state(), RunState::Running(SyncMode::Pull));

    let second = orchestrator
        .run(request(SyncMode::Push, &[Domain::Ratings]).with_trigger(Trigger::LibraryChange))
        .await;
    assert_eq!(second.unwrap_err(), SyncError::AlreadyRunning);

    release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert!(first.success);
    assert_eq!(orchestrator.state(), RunState::Completed);
}

#[test]
fn test_request_pairs_respect_domain_support() {
    let pairs = SyncRequest::new(SyncMode::Pull)
        .with_domains([Domain::Watchlist, Domain::Watchlist])
        .with_media_types([MediaType::Movie, MediaType::Episode])
        .pairs();
    assert_eq!(pairs, vec![(Domain::Watchlist, MediaType::Movie)]);
}

#[test]
fn test_mode_parsing() {
    assert_eq!(SyncMode::parse("fast_pull"), Some(SyncMode::FastPull));
    assert_eq!(SyncMode::parse("Full"), Some(SyncMode::Full));
    assert_eq!(SyncMode::parse("sideways"), None);
}

#[tokio::test]
async fn test_unreadable_media_type_skips_only_its_pairs() {
    let harness = Harness::new(
        LibraryStore::new().with_item(1, movie("101", "tt1")),
        RemoteStore::new().with_item(remote_item("tt1", watched(1)), at(1)),
    );
    harness.library.fail_reads_for(MediaType::Episode).await;

    let result = harness
        .orchestrator()
        .run(
            SyncRequest::new(SyncMode::Pull)
                .with_domains([Domain::Watched])
                .with_media_types([MediaType::Movie, MediaType::Episode]),
        )
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].handler, "prime:episode");
    assert_eq!(result.stats.handlers_run, 1);
    assert_eq!(harness.library.writes().await.len(), 1);
}
