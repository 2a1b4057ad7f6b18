//! Refresh cycles for one repository root.
//!
//! A cycle runs the collaborator queries concurrently, each under its own
//! retry schedule, applies the outputs to the [`RepositoryModel`] and then
//! publishes the new snapshot to the resource grouper and the decoration
//! broadcaster, in that order.
//!
//! At most one cycle runs at a time. Requests arriving while a cycle is in
//! flight attach to it when it covers them; a full request arriving during a
//! status-only cycle queues a single full cycle behind it. Later requests
//! attach to the queued cycle. Every attached caller receives the same
//! outcome.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dstat_model::{RepositoryModel, Snapshot, StateUpdate};
use dstat_publish::{DecorationBroadcaster, SourceControlGrouper};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::error::{QueryError, RefreshError, RefreshResult};
use crate::queries::{RepositoryQueries, UntrackedSource};
use crate::retry::RetryPolicy;

/// Pipeline files whose change invalidates the tracked list.
const PIPELINE_FILES: [&str; 2] = ["dvc.yaml", "dvc.lock"];
const DECLARATION_EXTENSION: &str = "dvc";

/// What a refresh cycle queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshKind {
    /// Tracked list, diff, status and untracked paths.
    Full,
    /// Diff, status and untracked paths; tracked paths and tree are kept.
    StatusOnly,
}

impl RefreshKind {
    /// Returns `true` if a cycle of this kind satisfies a request for `other`.
    pub fn covers(self, other: RefreshKind) -> bool {
        self == RefreshKind::Full || other == RefreshKind::StatusOnly
    }
}

type Outcome = RefreshResult<Arc<Snapshot>>;
type OutcomeReceiver = watch::Receiver<Option<Outcome>>;
type OutcomeSender = watch::Sender<Option<Outcome>>;

struct InFlight {
    kind: RefreshKind,
    done: OutcomeReceiver,
}

#[derive(Default)]
struct Slot {
    running: Option<InFlight>,
    /// Always a full cycle.
    queued: Option<OutcomeReceiver>,
}

/// Returns `true` if a change to `path` can alter the tracked list.
pub fn is_pipeline_metadata(path: &Path) -> bool {
    let by_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| PIPELINE_FILES.contains(&name));
    by_name || path.extension().is_some_and(|ext| ext == DECLARATION_EXTENSION)
}

/// Drives refresh cycles for one repository root.
pub struct RefreshOrchestrator {
    root: PathBuf,
    model: Arc<RepositoryModel>,
    grouper: Arc<SourceControlGrouper>,
    decorations: Arc<DecorationBroadcaster>,
    queries: Arc<dyn RepositoryQueries>,
    untracked: Arc<dyn UntrackedSource>,
    retry: RetryPolicy,
    slot: Mutex<Slot>,
    ready: watch::Sender<bool>,
    failures: AtomicUsize,
}

impl RefreshOrchestrator {
    /// Create an orchestrator with its own model and publishers.
    pub fn new(
        root: impl Into<PathBuf>,
        queries: Arc<dyn RepositoryQueries>,
        untracked: Arc<dyn UntrackedSource>,
        config: &RefreshConfig,
    ) -> Arc<Self> {
        let root = root.into();
        let (ready, _) = watch::channel(false);
        Arc::new(Self {
            model: Arc::new(RepositoryModel::new(root.clone())),
            grouper: Arc::new(SourceControlGrouper::new(
                root.clone(),
                config.scm.clone(),
                config.channel_capacity,
            )),
            decorations: Arc::new(DecorationBroadcaster::new(root.clone(), config.channel_capacity)),
            root,
            queries,
            untracked,
            retry: config.retry_policy(),
            slot: Mutex::new(Slot::default()),
            ready,
            failures: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model(&self) -> &Arc<RepositoryModel> {
        &self.model
    }

    pub fn grouper(&self) -> &Arc<SourceControlGrouper> {
        &self.grouper
    }

    pub fn decorations(&self) -> &Arc<DecorationBroadcaster> {
        &self.decorations
    }

    /// Run (or join) a full refresh.
    pub async fn reset_state(self: &Arc<Self>) -> RefreshResult<Arc<Snapshot>> {
        self.request(RefreshKind::Full).await
    }

    /// Run (or join) a status-only refresh.
    pub async fn update_state(self: &Arc<Self>) -> RefreshResult<Arc<Snapshot>> {
        self.request(RefreshKind::StatusOnly).await
    }

    /// React to a filesystem change under the root.
    ///
    /// Changes to pipeline files or tracking declarations, and any change
    /// while a full cycle is pending, run a full refresh.
    pub async fn managed_update(self: &Arc<Self>, changed: &Path) -> RefreshResult<Arc<Snapshot>> {
        if is_pipeline_metadata(changed) || self.full_pending() {
            debug!(root = %self.root.display(), path = %changed.display(), "escalating to full refresh");
            self.reset_state().await
        } else {
            self.update_state().await
        }
    }

    /// Resolves once the first cycle has succeeded.
    pub async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Failed cycles since the last successful one.
    pub fn consecutive_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn full_pending(&self) -> bool {
        let slot = self.slot.lock().expect("refresh slot lock poisoned");
        slot.queued.is_some()
            || slot
                .running
                .as_ref()
                .is_some_and(|running| running.kind == RefreshKind::Full)
    }

    async fn request(self: &Arc<Self>, kind: RefreshKind) -> RefreshResult<Arc<Snapshot>> {
        let done = {
            let mut slot = self.slot.lock().expect("refresh slot lock poisoned");
            let covering = slot
                .running
                .as_ref()
                .filter(|running| running.kind.covers(kind))
                .map(|running| running.done.clone());

            if let Some(done) = covering {
                debug!(root = %self.root.display(), ?kind, "attaching to running cycle");
                done
            } else if let Some(queued) = &slot.queued {
                debug!(root = %self.root.display(), ?kind, "attaching to queued cycle");
                queued.clone()
            } else if let Some(previous) = slot.running.as_ref().map(|r| r.done.clone()) {
                let (tx, rx) = watch::channel(None);
                slot.queued = Some(rx.clone());
                debug!(root = %self.root.display(), "queueing full cycle");
                let this = Arc::clone(self);
                let own = rx.clone();
                tokio::spawn(async move {
                    let _ = wait(previous).await;
                    this.promote_queued(own);
                    this.run_cycle(RefreshKind::Full, tx).await;
                });
                rx
            } else {
                let (tx, rx) = watch::channel(None);
                slot.running = Some(InFlight {
                    kind,
                    done: rx.clone(),
                });
                let this = Arc::clone(self);
                tokio::spawn(async move { this.run_cycle(kind, tx).await });
                rx
            }
        };
        wait(done).await
    }

    fn promote_queued(&self, done: OutcomeReceiver) {
        let mut slot = self.slot.lock().expect("refresh slot lock poisoned");
        slot.queued = None;
        slot.running = Some(InFlight {
            kind: RefreshKind::Full,
            done,
        });
    }

    /// Run one cycle in its own task and publish the outcome.
    ///
    /// The slot is released even when a collaborator panics; the panic
    /// counts as a failed cycle.
    async fn run_cycle(self: Arc<Self>, kind: RefreshKind, tx: OutcomeSender) {
        let this = Arc::clone(&self);
        let outcome = match tokio::spawn(async move { this.execute(kind).await }).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(root = %self.root.display(), ?kind, failures, error = %err, "refresh cycle panicked");
                Err(RefreshError::Panicked(err.to_string()))
            }
        };
        self.slot.lock().expect("refresh slot lock poisoned").running = None;
        tx.send_replace(Some(outcome));
    }

    async fn execute(&self, kind: RefreshKind) -> Outcome {
        debug!(root = %self.root.display(), ?kind, "refresh cycle started");
        let root = self.root.as_path();
        let queries = &*self.queries;
        let untracked = &*self.untracked;
        let retry = &self.retry;

        // The first query to fail for good ends the cycle; its siblings are
        // dropped mid-retry.
        let diff = async {
            retry
                .run("diff_against_head", move || queries.diff_against_head(root))
                .await
                .map_err(failed("diff_against_head"))
        };
        let status = async {
            retry
                .run("status_against_cache", move || queries.status_against_cache(root))
                .await
                .map_err(failed("status_against_cache"))
        };
        let paths = async {
            retry
                .run("untracked_paths", move || untracked.untracked_paths(root))
                .await
                .map_err(failed("untracked_paths"))
        };

        let result = match kind {
            RefreshKind::Full => {
                let list = async {
                    retry
                        .run("tracked_list", move || queries.tracked_list(root))
                        .await
                        .map(Some)
                        .map_err(failed("tracked_list"))
                };
                tokio::try_join!(list, diff, status, paths)
            }
            RefreshKind::StatusOnly => {
                tokio::try_join!(async { Ok::<_, RefreshError>(None) }, diff, status, paths)
            }
        };

        match result {
            Ok((tracked, diff, status, untracked)) => {
                let snapshot = self.model.set_state(StateUpdate {
                    tracked,
                    diff,
                    status,
                    untracked,
                });
                self.grouper.set_state(&snapshot);
                self.decorations.set_state(Arc::clone(&snapshot));
                self.failures.store(0, Ordering::Relaxed);
                self.ready.send_replace(true);
                info!(
                    root = %self.root.display(),
                    ?kind,
                    tracked = snapshot.status.tracked.len(),
                    changes = snapshot.status.has_changes(),
                    "refresh cycle completed"
                );
                Ok(snapshot)
            }
            Err(err) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(root = %self.root.display(), ?kind, failures, error = %err, "refresh cycle failed");
                Err(err)
            }
        }
    }
}

fn failed(query: &'static str) -> impl Fn(QueryError) -> RefreshError {
    move |source| RefreshError::Query { query, source }
}

async fn wait(mut rx: OutcomeReceiver) -> Outcome {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone().unwrap_or(Err(RefreshError::Aborted)),
        Err(_) => Err(RefreshError::Aborted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryResult;
    use async_trait::async_trait;
    use dstat_types::{DiffOutput, StatusOutput, TrackedEntry};
    use std::collections::{BTreeMap, BTreeSet, VecDeque};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::time::Instant;

    fn root() -> PathBuf {
        PathBuf::from("/repo")
    }

    fn abs(rel: &str) -> PathBuf {
        root().join(rel)
    }

    #[derive(Default)]
    struct Calls {
        list: AtomicUsize,
        diff: AtomicUsize,
        status: AtomicUsize,
        untracked: AtomicUsize,
    }

    /// Scripted collaborators. Each call sleeps for `latency` first, so
    /// overlapping requests really overlap, then pops the next scripted
    /// failure for its query.
    #[derive(Default)]
    struct FakeQueries {
        listed: Vec<&'static str>,
        modified: Vec<&'static str>,
        latency: Duration,
        failures: Mutex<BTreeMap<&'static str, VecDeque<QueryError>>>,
        panic_list_once: AtomicBool,
        calls: Calls,
    }

    impl FakeQueries {
        fn new(listed: Vec<&'static str>, modified: Vec<&'static str>) -> Self {
            Self {
                listed,
                modified,
                latency: Duration::from_millis(50),
                ..Default::default()
            }
        }

        fn failing(self, query: &'static str, failures: Vec<QueryError>) -> Self {
            self.failures.lock().unwrap().insert(query, failures.into());
            self
        }

        fn failing_list(self, failures: Vec<QueryError>) -> Self {
            self.failing("tracked_list", failures)
        }

        fn panicking_list_once(self) -> Self {
            self.panic_list_once.store(true, Ordering::SeqCst);
            self
        }

        async fn answer(&self, query: &'static str, calls: &AtomicUsize) -> QueryResult<()> {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            let failure = self
                .failures
                .lock()
                .unwrap()
                .get_mut(query)
                .and_then(VecDeque::pop_front);
            failure.map_or(Ok(()), Err)
        }
    }

    #[async_trait]
    impl RepositoryQueries for FakeQueries {
        async fn tracked_list(&self, _root: &Path) -> QueryResult<Vec<TrackedEntry>> {
            self.answer("tracked_list", &self.calls.list).await?;
            if self.panic_list_once.swap(false, Ordering::SeqCst) {
                panic!("list output reader crashed");
            }
            Ok(self.listed.iter().map(|p| TrackedEntry::file(*p)).collect())
        }

        async fn diff_against_head(&self, _root: &Path) -> QueryResult<DiffOutput> {
            self.answer("diff_against_head", &self.calls.diff).await?;
            Ok(DiffOutput {
                modified: self.modified.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            })
        }

        async fn status_against_cache(&self, _root: &Path) -> QueryResult<StatusOutput> {
            self.answer("status_against_cache", &self.calls.status).await?;
            Ok(StatusOutput::new())
        }
    }

    #[async_trait]
    impl UntrackedSource for FakeQueries {
        async fn untracked_paths(&self, root: &Path) -> QueryResult<BTreeSet<PathBuf>> {
            self.answer("untracked_paths", &self.calls.untracked).await?;
            Ok(BTreeSet::from([root.join("scratch.txt")]))
        }
    }

    fn setup(fake: FakeQueries) -> (Arc<RefreshOrchestrator>, Arc<FakeQueries>) {
        let fake = Arc::new(fake);
        let orchestrator = RefreshOrchestrator::new(
            root(),
            fake.clone(),
            fake.clone(),
            &RefreshConfig::default(),
        );
        (orchestrator, fake)
    }

    #[tokio::test(start_paused = true)]
    async fn reset_state_applies_and_publishes() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["data/a.csv", "model.pt"], vec!["model.pt"]));
        let mut groups = orchestrator.grouper().subscribe();
        let mut decorations = orchestrator.decorations().subscribe();
        assert!(!orchestrator.is_ready());

        let snapshot = orchestrator.reset_state().await.unwrap();

        assert!(snapshot.status.tracked.contains(&abs("data")));
        assert_eq!(snapshot.status.git_modified, BTreeSet::from([abs("model.pt")]));
        assert_eq!(snapshot.status.untracked, BTreeSet::from([abs("scratch.txt")]));
        assert!(Arc::ptr_eq(&orchestrator.model().get_state(), &snapshot));
        assert!(orchestrator.is_ready());

        let grouped = groups.try_recv().unwrap();
        assert_eq!(grouped.state.committed.len(), 1);
        assert!(groups.try_recv().is_err());
        let invalidated = decorations.try_recv().unwrap();
        assert!(invalidated.paths.contains(&abs("model.pt")));
        assert!(decorations.try_recv().is_err());
        assert!(Arc::ptr_eq(&orchestrator.decorations().snapshot(), &snapshot));

        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1);
        assert_eq!(fake.calls.untracked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_resets_share_one_cycle() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]));

        let (first, second) = tokio::join!(orchestrator.reset_state(), orchestrator.reset_state());
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));

        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1);
        assert_eq!(fake.calls.diff.load(Ordering::SeqCst), 1);
        assert_eq!(fake.calls.status.load(Ordering::SeqCst), 1);
        assert_eq!(fake.calls.untracked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn status_request_attaches_to_running_full_cycle() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]));

        let (full, status) = tokio::join!(orchestrator.reset_state(), orchestrator.update_state());
        assert!(Arc::ptr_eq(&full.unwrap(), &status.unwrap()));
        assert_eq!(fake.calls.diff.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_request_queues_behind_status_cycle() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]));

        let (status, full, again) = tokio::join!(
            orchestrator.update_state(),
            orchestrator.reset_state(),
            orchestrator.reset_state(),
        );
        let status = status.unwrap();
        let full = full.unwrap();
        assert!(Arc::ptr_eq(&full, &again.unwrap()));
        assert!(!Arc::ptr_eq(&status, &full));
        assert!(status.status.tracked.is_empty());
        assert!(full.status.tracked.contains(&abs("a")));

        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1);
        assert_eq!(fake.calls.diff.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn request_after_completion_starts_fresh_cycle() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]));
        let first = orchestrator.reset_state().await.unwrap();
        let second = orchestrator.reset_state().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.tree, &second.tree));
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 2);
        assert_eq!(orchestrator.model().tree_builds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_within_budget_succeed() {
        let fake = FakeQueries::new(vec!["a"], vec![]).failing_list(vec![
            QueryError::Transient("busy".into()),
            QueryError::Transient("busy".into()),
        ]);
        let (orchestrator, fake) = setup(fake);

        let snapshot = orchestrator.reset_state().await.unwrap();
        assert!(snapshot.status.tracked.contains(&abs("a")));
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 3);
        assert_eq!(fake.calls.diff.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_keep_previous_snapshot() {
        let fake = FakeQueries::new(vec!["a"], vec![]).failing_list(vec![
            QueryError::Transient("down".into()),
            QueryError::Transient("down".into()),
            QueryError::Transient("down".into()),
        ]);
        let (orchestrator, fake) = setup(fake);
        let mut decorations = orchestrator.decorations().subscribe();
        let before = orchestrator.model().get_state();

        let err = orchestrator.reset_state().await.unwrap_err();
        assert_eq!(
            err,
            RefreshError::Query {
                query: "tracked_list",
                source: QueryError::Transient("down".into()),
            }
        );
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 3);
        assert!(Arc::ptr_eq(&orchestrator.model().get_state(), &before));
        assert!(decorations.try_recv().is_err());
        assert!(orchestrator.grouper().get_state().is_empty());
        assert_eq!(orchestrator.consecutive_failures(), 1);
        assert!(!orchestrator.is_ready());

        orchestrator.reset_state().await.unwrap();
        assert_eq!(orchestrator.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_output_fails_without_retry() {
        let fake = FakeQueries::new(vec!["a"], vec![])
            .failing_list(vec![QueryError::Malformed("unexpected token".into())]);
        let (orchestrator, fake) = setup(fake);

        let err = orchestrator.reset_state().await.unwrap_err();
        assert!(matches!(err, RefreshError::Query { source: QueryError::Malformed(_), .. }));
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1);
    }

    const RETRIED_QUERIES: [&str; 3] = ["diff_against_head", "status_against_cache", "untracked_paths"];

    fn counter<'a>(calls: &'a Calls, query: &str) -> &'a AtomicUsize {
        match query {
            "tracked_list" => &calls.list,
            "diff_against_head" => &calls.diff,
            "status_against_cache" => &calls.status,
            _ => &calls.untracked,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_query_retries_within_budget() {
        for query in RETRIED_QUERIES {
            let fake = FakeQueries::new(vec!["a"], vec![]).failing(
                query,
                vec![QueryError::Transient("busy".into()), QueryError::Transient("busy".into())],
            );
            let (orchestrator, fake) = setup(fake);

            orchestrator.reset_state().await.unwrap();
            assert_eq!(counter(&fake.calls, query).load(Ordering::SeqCst), 3, "{query}");
            assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1, "{query}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_query_gives_up_after_budget() {
        for query in RETRIED_QUERIES {
            let fake = FakeQueries::new(vec!["a"], vec![]).failing(
                query,
                vec![
                    QueryError::Transient("down".into()),
                    QueryError::Transient("down".into()),
                    QueryError::Transient("down".into()),
                ],
            );
            let (orchestrator, fake) = setup(fake);
            let before = orchestrator.model().get_state();

            let err = orchestrator.reset_state().await.unwrap_err();
            assert_eq!(
                err,
                RefreshError::Query {
                    query,
                    source: QueryError::Transient("down".into()),
                }
            );
            assert_eq!(counter(&fake.calls, query).load(Ordering::SeqCst), 3, "{query}");
            assert!(Arc::ptr_eq(&orchestrator.model().get_state(), &before));
            assert_eq!(orchestrator.consecutive_failures(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_output_ends_cycle_without_waiting_for_siblings() {
        let fake = FakeQueries::new(vec!["a"], vec![])
            .failing("diff_against_head", vec![QueryError::Malformed("bad json".into())])
            .failing(
                "status_against_cache",
                vec![QueryError::Transient("busy".into()), QueryError::Transient("busy".into())],
            );
        let (orchestrator, fake) = setup(fake);

        let started = Instant::now();
        let err = orchestrator.reset_state().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(500), "took {:?}", started.elapsed());
        assert_eq!(
            err,
            RefreshError::Query {
                query: "diff_against_head",
                source: QueryError::Malformed("bad json".into()),
            }
        );
        assert_eq!(fake.calls.status.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.consecutive_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_collaborator_fails_cycle_and_releases_root() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]).panicking_list_once());

        let (first, attached) = tokio::join!(orchestrator.reset_state(), orchestrator.update_state());
        let first = first.unwrap_err();
        assert!(matches!(first, RefreshError::Panicked(_)));
        assert_eq!(first, attached.unwrap_err());
        assert_eq!(orchestrator.consecutive_failures(), 1);
        assert!(!orchestrator.is_ready());
        assert!(!orchestrator.full_pending());

        let snapshot = orchestrator.reset_state().await.unwrap();
        assert!(snapshot.status.tracked.contains(&abs("a")));
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 2);
        assert_eq!(orchestrator.consecutive_failures(), 0);
        assert!(orchestrator.is_ready());
    }

    /// Records the message of every tracing event, in emission order.
    struct MessageLog(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for MessageLog {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            struct Message(String);

            impl tracing::field::Visit for Message {
                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        self.0 = format!("{value:?}");
                    }
                }
            }

            let mut message = Message(String::new());
            event.record(&mut message);
            self.0.lock().unwrap().push(message.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn groups_publish_before_decorations() {
        use tracing_subscriber::layer::SubscriberExt;

        let messages = Arc::new(Mutex::new(Vec::new()));
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(MessageLog(Arc::clone(&messages))),
        );
        let (orchestrator, _fake) = setup(FakeQueries::new(vec!["a"], vec!["a"]));

        orchestrator.reset_state().await.unwrap();

        let messages = messages.lock().unwrap();
        let published: Vec<&str> = messages
            .iter()
            .map(String::as_str)
            .filter(|m| {
                ["resource groups updated", "decorations invalidated", "refresh cycle completed"].contains(m)
            })
            .collect();
        assert_eq!(
            published,
            vec!["resource groups updated", "decorations invalidated", "refresh cycle completed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn coalesced_callers_share_failure() {
        let fake = FakeQueries::new(vec!["a"], vec![])
            .failing_list(vec![QueryError::Malformed("truncated".into())]);
        let (orchestrator, _fake) = setup(fake);

        let (first, second) = tokio::join!(orchestrator.reset_state(), orchestrator.reset_state());
        assert_eq!(first.unwrap_err(), second.unwrap_err());
        assert_eq!(orchestrator.consecutive_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn status_only_cycle_skips_tracked_list() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["model.pt"], vec!["model.pt"]));
        orchestrator.reset_state().await.unwrap();
        let snapshot = orchestrator.update_state().await.unwrap();

        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1);
        assert_eq!(fake.calls.diff.load(Ordering::SeqCst), 2);
        assert!(snapshot.status.tracked.contains(&abs("model.pt")));
        assert_eq!(snapshot.status.git_modified, BTreeSet::from([abs("model.pt")]));
    }

    #[tokio::test(start_paused = true)]
    async fn managed_update_escalates_on_pipeline_files() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]));

        orchestrator.managed_update(&abs("notes.txt")).await.unwrap();
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 0);

        orchestrator.managed_update(&abs("dvc.lock")).await.unwrap();
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 1);

        orchestrator.managed_update(&abs("data/images.dvc")).await.unwrap();
        assert_eq!(fake.calls.list.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn managed_update_joins_pending_full_cycle() {
        let (orchestrator, fake) = setup(FakeQueries::new(vec!["a"], vec![]));
        let notes = abs("notes.txt");

        let (full, managed) = tokio::join!(orchestrator.reset_state(), orchestrator.managed_update(&notes));
        assert!(Arc::ptr_eq(&full.unwrap(), &managed.unwrap()));
        assert_eq!(fake.calls.diff.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_resolves_after_first_success() {
        let (orchestrator, _fake) = setup(FakeQueries::new(vec!["a"], vec![]));
        let waiter = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.ready().await })
        };
        orchestrator.reset_state().await.unwrap();
        waiter.await.unwrap();
        assert!(orchestrator.is_ready());
    }

    #[test]
    fn pipeline_metadata_detection() {
        assert!(is_pipeline_metadata(Path::new("/repo/dvc.yaml")));
        assert!(is_pipeline_metadata(Path::new("/repo/sub/dvc.lock")));
        assert!(is_pipeline_metadata(Path::new("/repo/model.pt.dvc")));
        assert!(!is_pipeline_metadata(Path::new("/repo/model.pt")));
        assert!(!is_pipeline_metadata(Path::new("/repo/dvc.yaml.bak")));
    }

    #[test]
    fn kind_coverage() {
        assert!(RefreshKind::Full.covers(RefreshKind::StatusOnly));
        assert!(RefreshKind::Full.covers(RefreshKind::Full));
        assert!(RefreshKind::StatusOnly.covers(RefreshKind::StatusOnly));
        assert!(!RefreshKind::StatusOnly.covers(RefreshKind::Full));
    }
}
