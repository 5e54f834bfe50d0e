//! Supervisor and reconciliation loop
//!
//! The supervisor composes the whole system: it seeds the store, starts
//! the workers and the background sink consumers, and runs the single
//! reconciliation loop that serializes every worker-state observation.
//! That loop is the only writer of dispatch state, which is what prevents
//! racy double-counting of idle workers: completion is signalled exactly
//! once, when every worker is inactive or finished and the queue is empty.
//!
//! Note the exhaustion predicate looks at the queue and the worker phases
//! only. A pipeline task that has not yet emitted its discoveries does not
//! hold the run open: a discovery arriving after completion fired is still
//! accepted by the store (until it closes) but never dispatched.

use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::router::{accept_all, route_discoveries, same_host, LinkPolicy};
use crate::crawler::worker::{CompletedRequest, Worker, WorkerPhase};
use crate::output::{sink_for, OutputSink};
use crate::pipeline::{DiscoverySink, Pipeline};
use crate::store::{MemoryStore, StoreError, UrlStore};
use crate::AmberError;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Everything the reconciliation loop reacts to. Worker phase reports,
/// dispatch kicks from the discovery router, and the shutdown request all
/// travel through one queue so they are observed in a single order.
#[derive(Debug)]
pub(crate) enum SupervisorEvent {
    Phase { worker: usize, phase: WorkerPhase },
    WorkQueued,
    Shutdown,
}

/// Owns the crawl: builds the seed frontier, starts workers, routes
/// discoveries, and detects completion. Created once per run.
pub struct Supervisor {
    config: Arc<Config>,
    store: Arc<dyn UrlStore>,
    fetcher: Arc<dyn Fetcher>,
    pipeline: Arc<Pipeline>,
    output: Arc<dyn OutputSink>,
    policy: LinkPolicy,
}

impl Supervisor {
    /// Builds a supervisor with the default collaborators: reqwest-backed
    /// fetcher, in-memory store, link-following pipeline, and the output
    /// sink selected by the configured root.
    pub fn new(config: Config) -> Result<Self, AmberError> {
        let fetcher = HttpFetcher::new(&config.request)?;

        let policy = if config.crawl.same_host_only {
            same_host()
        } else {
            accept_all()
        };

        let output = sink_for(config.output.root.as_deref());

        Ok(Self {
            store: Arc::new(MemoryStore::new()),
            fetcher: Arc::new(fetcher),
            pipeline: Arc::new(Pipeline::standard()),
            output,
            policy,
            config: Arc::new(config),
        })
    }

    /// Replaces the fetch capability. Mostly useful for tests and embedders
    /// with their own transport.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replaces the content pipeline.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// Replaces the link acceptance policy.
    pub fn with_policy(mut self, policy: LinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the dedup/queue store, e.g. to share one between instances.
    pub fn with_store(mut self, store: Arc<dyn UrlStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the output sink.
    pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = output;
        self
    }

    /// The store backing this run, for inspection after [`Supervisor::run`].
    pub fn store(&self) -> Arc<dyn UrlStore> {
        Arc::clone(&self.store)
    }

    /// Runs the crawl to completion.
    ///
    /// Seeds the frontier (fatal on an empty seed set or an unusable
    /// sitemap/stats configuration), spawns workers and consumers, then
    /// blocks until the reconciliation loop signals that no work remains.
    /// Outstanding fetches and pipelines are drained, never cancelled.
    pub async fn run(&self) -> Result<(), AmberError> {
        tracing::info!("starting webamber");

        self.build_seed_urls().await?;

        let stats = match &self.config.output.stats_path {
            Some(path) => Some(
                std::fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(path)?,
            ),
            None => None,
        };

        let workers = self.config.crawl.workers;
        let (event_tx, event_rx) = mpsc::channel(workers * 2 + 16);
        let (completed_tx, completed_rx) = mpsc::channel(64);
        let (error_tx, error_rx) = mpsc::channel(64);
        let (discovered_tx, discovered_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();

        let errors_task = tokio::spawn(consume_errors(
            error_rx,
            Arc::clone(&self.store),
            self.config.crawl.retry_failed,
        ));
        let completed_task = tokio::spawn(consume_completed(
            completed_rx,
            Arc::clone(&self.store),
            stats,
        ));
        let router_task = tokio::spawn(route_discoveries(
            discovered_rx,
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            event_tx.clone(),
        ));

        let mut inboxes = Vec::with_capacity(workers);
        let mut worker_tasks = Vec::with_capacity(workers);
        for id in 0..workers {
            let (inbox_tx, inbox_rx) = mpsc::channel(1);
            inboxes.push(Some(inbox_tx));

            tracing::info!(worker = id, "starting worker");
            worker_tasks.push(tokio::spawn(
                Worker {
                    id,
                    inbox: inbox_rx,
                    events: event_tx.clone(),
                    completed: completed_tx.clone(),
                    errors: error_tx.clone(),
                    discoveries: DiscoverySink::new(discovered_tx.clone()),
                    fetcher: Arc::clone(&self.fetcher),
                    pipeline: Arc::clone(&self.pipeline),
                    output: Arc::clone(&self.output),
                    delay: self.config.crawl.delay,
                }
                .run(),
            ));
        }

        // The spawned tasks own the sink senders from here on; holding
        // originals would keep the consumers alive past shutdown.
        drop(completed_tx);
        drop(error_tx);
        drop(discovered_tx);

        let reconciler = tokio::spawn(reconcile(
            event_rx,
            inboxes,
            Arc::clone(&self.store),
            done_tx,
        ));

        // We are done when all workers are settled and the queue is empty.
        let _ = done_rx.await;
        tracing::info!("no more urls to process; stopping");

        // Close every inbox and the store; outstanding work drains.
        let _ = event_tx.send(SupervisorEvent::Shutdown).await;
        drop(event_tx);

        let _ = reconciler.await;
        for task in worker_tasks {
            let _ = task.await;
        }
        let _ = router_task.await;
        let _ = completed_task.await;
        let _ = errors_task.await;

        Ok(())
    }

    /// Builds the seed frontier: sitemap URLs (when the sitemap responds
    /// with a sub-300 status), then explicit seeds, then the base URL.
    async fn build_seed_urls(&self) -> Result<(), AmberError> {
        let mut seeds: Vec<String> = Vec::new();

        if let Some(sitemap_url) = &self.config.crawl.sitemap {
            let response = self.fetcher.fetch(sitemap_url).await?;

            if response.status < 300 {
                let urls = crate::sitemap::parse_sitemap(&response.body)?;
                tracing::info!(count = urls.len(), "sitemap yielded seed urls");
                seeds.extend(urls);
            } else {
                tracing::warn!(
                    status = response.status,
                    "sitemap fetch unsuccessful; continuing without it"
                );
            }
        }

        seeds.extend(self.config.crawl.seeds.iter().cloned());

        if let Some(base) = &self.config.crawl.url {
            seeds.push(base.clone());
        }

        if seeds.is_empty() {
            return Err(AmberError::EmptySeed);
        }

        for seed in &seeds {
            let parsed =
                crate::url::parse_url(seed).map_err(|_| AmberError::InvalidSeed(seed.clone()))?;

            match self.store.enqueue(parsed.as_str()) {
                Ok(()) => {}
                Err(err @ StoreError::Duplicate(_)) => tracing::info!("{}", err),
                Err(err @ StoreError::Closed) => return Err(err.into()),
            }
        }

        tracing::info!(count = seeds.len(), "found seed urls");
        Ok(())
    }
}

/// The reconciliation loop: the system's single serialization point.
/// Processes events in arrival order, one at a time, until every event
/// sender is gone.
async fn reconcile(
    mut events: mpsc::Receiver<SupervisorEvent>,
    mut inboxes: Vec<Option<mpsc::Sender<String>>>,
    store: Arc<dyn UrlStore>,
    done: oneshot::Sender<()>,
) {
    let mut phases = vec![WorkerPhase::Inactive; inboxes.len()];
    let mut done = Some(done);

    while let Some(event) = events.recv().await {
        match event {
            SupervisorEvent::Phase { worker, phase } => {
                // The transition table rejects stale reports: a worker that
                // announced itself idle just before a dispatch reached its
                // inbox is Receiving, not Inactive, and treating the stale
                // report as current could fire the done signal with an
                // assignment still in flight.
                if !phases[worker].can_transition(phase) {
                    tracing::debug!(
                        worker,
                        from = %phases[worker],
                        to = %phase,
                        "ignoring stale phase report"
                    );
                    continue;
                }
                phases[worker] = phase;
                tracing::info!(worker, phase = %phase, "worker status");

                match phase {
                    WorkerPhase::Inactive => {
                        if phases.iter().all(|p| p.is_settled()) && store.is_exhausted() {
                            // Guarded: a second signal is a no-op.
                            if let Some(tx) = done.take() {
                                let _ = tx.send(());
                            }
                        }
                        dispatch(&mut phases, &inboxes, &store, worker).await;
                    }
                    WorkerPhase::Waiting => {
                        dispatch(&mut phases, &inboxes, &store, worker).await;
                    }
                    _ => {}
                }
            }
            SupervisorEvent::WorkQueued => {
                for worker in 0..phases.len() {
                    dispatch(&mut phases, &inboxes, &store, worker).await;
                }
            }
            SupervisorEvent::Shutdown => {
                for (worker, inbox) in inboxes.iter_mut().enumerate() {
                    if inbox.take().is_some() {
                        tracing::info!(worker, "stopping worker");
                    }
                }
                store.close();
                store.clear();
            }
        }
    }
}

/// Sends the next queued URL to `worker` if it can accept work. The
/// tracked phase flips to Receiving before the push so a second dispatch
/// cannot race into the same worker before its own report arrives.
async fn dispatch(
    phases: &mut [WorkerPhase],
    inboxes: &[Option<mpsc::Sender<String>>],
    store: &Arc<dyn UrlStore>,
    worker: usize,
) {
    if !phases[worker].can_accept_work() {
        return;
    }

    let Some(inbox) = &inboxes[worker] else { return };

    if let Some(url) = store.dequeue() {
        tracing::info!(worker, url = %url, "dispatching url");
        phases[worker] = WorkerPhase::Receiving;

        if inbox.send(url).await.is_err() {
            tracing::warn!(worker, "worker inbox closed; url dropped");
        }
    }
}

/// Logs every non-fatal worker error. With the retry-failed policy on, a
/// transport-failed URL's reservation is released so a later discovery may
/// queue it again.
async fn consume_errors(
    mut errors: mpsc::Receiver<AmberError>,
    store: Arc<dyn UrlStore>,
    retry_failed: bool,
) {
    while let Some(err) = errors.recv().await {
        if retry_failed {
            if let AmberError::Fetch(fetch_err) = &err {
                if let Some(url) = fetch_err.url() {
                    store.release(url);
                    tracing::info!(url, "released reservation after failed fetch");
                }
            }
        }

        tracing::error!(error = %err, "worker error");
    }
}

/// Records every completed request in the store and, when configured,
/// appends a "url status" line to the stats file.
async fn consume_completed(
    mut completed: mpsc::Receiver<CompletedRequest>,
    store: Arc<dyn UrlStore>,
    mut stats: Option<std::fs::File>,
) {
    while let Some(request) = completed.recv().await {
        tracing::info!(url = %request.url, status = request.status, "request completed");

        if let Some(file) = stats.as_mut() {
            if let Err(err) = writeln!(file, "{} {}", request.url, request.status) {
                tracing::error!(error = %err, "failed to append stats line");
            }
        }

        store.record_completion(&request.url, request.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlConfig, OutputConfig, RequestConfig};
    use crate::crawler::fetcher::{FetchError, FetchResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(200);

    struct StaticFetcher {
        pages: HashMap<String, (u16, String)>,
    }

    impl StaticFetcher {
        fn new(pages: &[(&str, u16, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, status, body)| {
                        (url.to_string(), (*status, body.to_string()))
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
            match self.pages.get(url) {
                Some((status, body)) => Ok(FetchResponse {
                    status: *status,
                    body: body.clone().into_bytes(),
                }),
                None => Ok(FetchResponse {
                    status: 404,
                    body: Vec::new(),
                }),
            }
        }
    }

    /// Fails every request at the transport level.
    struct DeadFetcher;

    #[async_trait]
    impl Fetcher for DeadFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
            Err(FetchError::Transport {
                url: url.to_string(),
                source: reqwest::Client::new().get("no scheme").send().await.unwrap_err(),
            })
        }
    }

    fn test_config(url: Option<&str>, workers: usize) -> Config {
        Config {
            crawl: CrawlConfig {
                url: url.map(str::to_string),
                sitemap: None,
                seeds: vec![],
                workers,
                delay: Duration::ZERO,
                same_host_only: false,
                retry_failed: false,
            },
            request: RequestConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_full_crawl_follows_links() {
        let fetcher = StaticFetcher::new(&[
            (
                "http://a.test/",
                200,
                r#"<html><body><a href="/p2">next</a></body></html>"#,
            ),
            ("http://a.test/p2", 200, "<html><body>end</body></html>"),
        ]);

        let supervisor = Supervisor::new(test_config(Some("http://a.test/"), 1))
            .unwrap()
            .with_fetcher(Arc::new(fetcher));
        let store = supervisor.store();

        supervisor.run().await.unwrap();

        // Both pages were dispatched and completed; the run ended on its own.
        assert_eq!(store.completion("http://a.test/"), Some(200));
        assert_eq!(store.completion("http://a.test/p2"), Some(200));
        assert!(store.is_exhausted());
    }

    #[tokio::test]
    async fn test_empty_seed_set_is_fatal() {
        let supervisor = Supervisor::new(test_config(None, 1)).unwrap();

        let err = supervisor.run().await.unwrap_err();
        assert!(matches!(err, AmberError::EmptySeed));
    }

    #[tokio::test]
    async fn test_invalid_seed_is_fatal() {
        let mut config = test_config(None, 1);
        config.crawl.seeds = vec!["not-a-url".to_string()];

        let supervisor = Supervisor::new(config).unwrap();
        let err = supervisor.run().await.unwrap_err();
        assert!(matches!(err, AmberError::InvalidSeed(_)));
    }

    #[tokio::test]
    async fn test_sitemap_seeds_frontier() {
        let sitemap = r#"<urlset><url><loc>http://a.test/from-sitemap</loc></url></urlset>"#;
        let fetcher = StaticFetcher::new(&[
            ("http://a.test/sitemap.xml", 200, sitemap),
            ("http://a.test/from-sitemap", 200, "<html></html>"),
            ("http://a.test/", 200, "<html></html>"),
        ]);

        let mut config = test_config(Some("http://a.test/"), 1);
        config.crawl.sitemap = Some("http://a.test/sitemap.xml".to_string());

        let supervisor = Supervisor::new(config)
            .unwrap()
            .with_fetcher(Arc::new(fetcher));
        let store = supervisor.store();

        supervisor.run().await.unwrap();

        assert_eq!(store.completion("http://a.test/from-sitemap"), Some(200));
        assert_eq!(store.completion("http://a.test/"), Some(200));
    }

    #[tokio::test]
    async fn test_redirected_sitemap_is_benign() {
        let fetcher = StaticFetcher::new(&[
            ("http://a.test/sitemap.xml", 301, ""),
            ("http://a.test/", 200, "<html></html>"),
        ]);

        let mut config = test_config(Some("http://a.test/"), 1);
        config.crawl.sitemap = Some("http://a.test/sitemap.xml".to_string());

        let supervisor = Supervisor::new(config)
            .unwrap()
            .with_fetcher(Arc::new(fetcher));
        let store = supervisor.store();

        supervisor.run().await.unwrap();

        assert_eq!(store.completion("http://a.test/"), Some(200));
        assert_eq!(store.known_len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_sitemap_is_fatal() {
        let mut config = test_config(Some("http://a.test/"), 1);
        config.crawl.sitemap = Some("http://a.test/sitemap.xml".to_string());

        let supervisor = Supervisor::new(config)
            .unwrap()
            .with_fetcher(Arc::new(DeadFetcher));

        let err = supervisor.run().await.unwrap_err();
        assert!(matches!(err, AmberError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_stays_reserved_by_default() {
        let supervisor = Supervisor::new(test_config(Some("http://a.test/"), 1))
            .unwrap()
            .with_fetcher(Arc::new(DeadFetcher));
        let store = supervisor.store();

        supervisor.run().await.unwrap();

        // Never completed, never released: the placeholder survives the run.
        assert_eq!(store.completion("http://a.test/"), Some(0));
    }

    #[tokio::test]
    async fn test_retry_failed_releases_reservation() {
        let mut config = test_config(Some("http://a.test/"), 1);
        config.crawl.retry_failed = true;

        let supervisor = Supervisor::new(config)
            .unwrap()
            .with_fetcher(Arc::new(DeadFetcher));
        let store = supervisor.store();

        supervisor.run().await.unwrap();

        assert_eq!(store.completion("http://a.test/"), None);
    }

    #[tokio::test]
    async fn test_multi_worker_crawl_completes() {
        let fetcher = StaticFetcher::new(&[
            (
                "http://a.test/",
                200,
                r#"<a href="/p1"></a><a href="/p2"></a><a href="/p3"></a>"#,
            ),
            ("http://a.test/p1", 200, ""),
            ("http://a.test/p2", 200, ""),
            ("http://a.test/p3", 200, ""),
        ]);

        let supervisor = Supervisor::new(test_config(Some("http://a.test/"), 3))
            .unwrap()
            .with_fetcher(Arc::new(fetcher));
        let store = supervisor.store();

        supervisor.run().await.unwrap();

        for url in [
            "http://a.test/",
            "http://a.test/p1",
            "http://a.test/p2",
            "http://a.test/p3",
        ] {
            assert_eq!(store.completion(url), Some(200), "missing {}", url);
        }
    }

    // --- reconciliation loop ---

    struct ReconcileHarness {
        events: mpsc::Sender<SupervisorEvent>,
        inboxes: Vec<mpsc::Receiver<String>>,
        done: oneshot::Receiver<()>,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn_reconcile(workers: usize, store: Arc<dyn UrlStore>) -> ReconcileHarness {
        let (event_tx, event_rx) = mpsc::channel(16);
        let (done_tx, done_rx) = oneshot::channel();

        let mut senders = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..workers {
            let (tx, rx) = mpsc::channel(1);
            senders.push(Some(tx));
            receivers.push(rx);
        }

        let task = tokio::spawn(reconcile(event_rx, senders, store, done_tx));

        ReconcileHarness {
            events: event_tx,
            inboxes: receivers,
            done: done_rx,
            task,
        }
    }

    async fn report(harness: &ReconcileHarness, worker: usize, phase: WorkerPhase) {
        harness
            .events
            .send(SupervisorEvent::Phase { worker, phase })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_done_fires_when_settled_and_exhausted() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        let mut harness = spawn_reconcile(2, Arc::clone(&store));

        report(&harness, 0, WorkerPhase::Inactive).await;
        report(&harness, 1, WorkerPhase::Inactive).await;

        timeout(TICK, &mut harness.done).await.unwrap().unwrap();

        // A later inactive report after the signal is a no-op.
        report(&harness, 0, WorkerPhase::Inactive).await;
        drop(harness.events);
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_done_while_a_worker_is_waiting() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        let mut harness = spawn_reconcile(2, Arc::clone(&store));

        report(&harness, 1, WorkerPhase::Waiting).await;
        report(&harness, 0, WorkerPhase::Inactive).await;

        assert!(timeout(TICK, &mut harness.done).await.is_err());

        // The waiting worker settling completes the predicate.
        report(&harness, 1, WorkerPhase::Inactive).await;
        timeout(TICK, &mut harness.done).await.unwrap().unwrap();

        drop(harness.events);
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_done_while_queue_has_work() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        store.enqueue("http://a.test/pending").unwrap();
        // Two workers: dispatching the single queued URL to worker 0 leaves
        // worker 1's inactive report unable to fire done (0 is Receiving).
        let mut harness = spawn_reconcile(2, Arc::clone(&store));

        report(&harness, 0, WorkerPhase::Inactive).await;
        assert_eq!(
            timeout(TICK, harness.inboxes[0].recv()).await.unwrap(),
            Some("http://a.test/pending".to_string())
        );

        report(&harness, 1, WorkerPhase::Inactive).await;
        assert!(timeout(TICK, &mut harness.done).await.is_err());

        drop(harness.events);
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_work_queued_dispatches_in_ascending_id_order() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        store.enqueue("http://a.test/first").unwrap();

        let mut harness = spawn_reconcile(2, Arc::clone(&store));
        harness.events.send(SupervisorEvent::WorkQueued).await.unwrap();

        assert_eq!(
            timeout(TICK, harness.inboxes[0].recv()).await.unwrap(),
            Some("http://a.test/first".to_string())
        );

        // Worker 0 is now tracked Receiving; the next kick must skip it.
        store.enqueue("http://a.test/second").unwrap();
        harness.events.send(SupervisorEvent::WorkQueued).await.unwrap();

        assert_eq!(
            timeout(TICK, harness.inboxes[1].recv()).await.unwrap(),
            Some("http://a.test/second".to_string())
        );

        drop(harness.events);
        harness.task.await.unwrap();
    }

    /// The exhaustion predicate deliberately ignores dispatched-but-not-yet
    /// completed URLs and in-flight pipelines: a reserved URL with an empty
    /// queue does not hold the run open.
    #[tokio::test]
    async fn test_exhaustion_ignores_in_flight_work() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        store.enqueue("http://a.test/in-flight").unwrap();
        store.dequeue().unwrap();

        let mut harness = spawn_reconcile(1, Arc::clone(&store));
        report(&harness, 0, WorkerPhase::Inactive).await;

        timeout(TICK, &mut harness.done).await.unwrap().unwrap();
        assert_eq!(store.completion("http://a.test/in-flight"), Some(0));

        drop(harness.events);
        harness.task.await.unwrap();
    }

    /// A worker that announced itself idle just before a dispatch reached
    /// its inbox must not satisfy the exhaustion predicate: the stale
    /// report is an illegal Receiving transition and is dropped.
    #[tokio::test]
    async fn test_stale_inactive_report_does_not_fire_done() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        store.enqueue("http://a.test/only").unwrap();

        let mut harness = spawn_reconcile(1, Arc::clone(&store));
        harness.events.send(SupervisorEvent::WorkQueued).await.unwrap();
        assert_eq!(
            timeout(TICK, harness.inboxes[0].recv()).await.unwrap(),
            Some("http://a.test/only".to_string())
        );

        // Queue is now empty; a stale inactive report while Receiving must
        // not end the run.
        report(&harness, 0, WorkerPhase::Inactive).await;
        assert!(timeout(TICK, &mut harness.done).await.is_err());

        // The real lifecycle proceeds and settles the run.
        report(&harness, 0, WorkerPhase::Running).await;
        report(&harness, 0, WorkerPhase::Inactive).await;
        timeout(TICK, &mut harness.done).await.unwrap().unwrap();

        drop(harness.events);
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_inboxes_and_store() {
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        store.enqueue("http://a.test/queued").unwrap();

        let mut harness = spawn_reconcile(1, Arc::clone(&store));
        harness.events.send(SupervisorEvent::Shutdown).await.unwrap();

        // Inbox closed.
        assert_eq!(timeout(TICK, harness.inboxes[0].recv()).await.unwrap(), None);

        // Store closed to new entries and drained.
        assert!(matches!(
            store.enqueue("http://a.test/late"),
            Err(StoreError::Closed)
        ));
        assert!(store.is_exhausted());

        drop(harness.events);
        harness.task.await.unwrap();
    }
}
