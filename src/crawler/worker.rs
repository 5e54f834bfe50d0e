//! Worker lifecycle and fetch/pipeline hand-off
//!
//! A worker owns a single-slot inbox through which the supervisor pushes
//! exactly one URL at a time; it never reads the shared store directly.
//! On assignment it fetches the URL, reports the completed request, and
//! hands the body to an independently spawned pipeline task, immediately
//! becoming eligible for its next assignment while that task drains in the
//! background. Only the count of outstanding pipeline tasks is tracked;
//! their results never flow back through the worker.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::supervisor::SupervisorEvent;
use crate::output::OutputSink;
use crate::pipeline::{DiscoverySink, Pipeline};
use crate::AmberError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Lifecycle state of a worker.
///
/// `Receiving` is only ever set by the supervisor at dispatch time, before
/// the worker itself observes the assignment; the worker reports the other
/// five states over the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// No work to do and no pipelines outstanding
    Inactive,

    /// An assignment is on its way from the supervisor
    Receiving,

    /// Currently fetching a URL
    Running,

    /// Pipelines still draining, but ready for another assignment
    Waiting,

    /// Inbox closed, waiting for remaining pipelines to finish
    Stopping,

    /// All pending work complete
    Finished,
}

impl WorkerPhase {
    /// True when the supervisor may push an assignment to this worker.
    pub fn can_accept_work(&self) -> bool {
        matches!(self, Self::Inactive | Self::Waiting)
    }

    /// True for the states that count toward global exhaustion.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Inactive | Self::Finished)
    }

    /// The lifecycle transition table. Self-transitions are permitted so
    /// repeated reports of the same state are not flagged.
    pub fn can_transition(self, next: WorkerPhase) -> bool {
        use WorkerPhase::*;

        self == next
            || matches!(
                (self, next),
                (Inactive, Receiving)
                    | (Inactive, Stopping)
                    | (Receiving, Running)
                    | (Running, Waiting)
                    | (Running, Inactive)
                    | (Waiting, Receiving)
                    | (Waiting, Inactive)
                    | (Waiting, Stopping)
                    | (Stopping, Finished)
            )
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Receiving => "receiving",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Stopping => "stopping",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Reported once per dispatched URL that received an HTTP response.
#[derive(Debug, Clone)]
pub struct CompletedRequest {
    pub url: String,
    pub status: u16,
}

/// A single worker task and its channel endpoints.
pub(crate) struct Worker {
    pub id: usize,
    pub inbox: mpsc::Receiver<String>,
    pub events: mpsc::Sender<SupervisorEvent>,
    pub completed: mpsc::Sender<CompletedRequest>,
    pub errors: mpsc::Sender<AmberError>,
    pub discoveries: DiscoverySink,
    pub fetcher: Arc<dyn Fetcher>,
    pub pipeline: Arc<Pipeline>,
    pub output: Arc<dyn OutputSink>,
    pub delay: Duration,
}

impl Worker {
    /// Main loop: wait for assignments and pipeline completions until the
    /// inbox closes, then drain to Finished.
    pub(crate) async fn run(mut self) {
        let (pipe_tx, mut pipe_rx) = mpsc::unbounded_channel::<()>();
        let mut pending: usize = 0;

        self.report(WorkerPhase::Inactive).await;

        loop {
            tokio::select! {
                assignment = self.inbox.recv() => {
                    let Some(url) = assignment else { break };

                    self.report(WorkerPhase::Running).await;
                    self.process(&url, &pipe_tx, &mut pending).await;
                    tokio::time::sleep(self.delay).await;

                    if pending > 0 {
                        self.report(WorkerPhase::Waiting).await;
                    } else {
                        self.report(WorkerPhase::Inactive).await;
                    }
                }
                Some(()) = pipe_rx.recv() => {
                    pending -= 1;
                    if pending == 0 {
                        self.report(WorkerPhase::Inactive).await;
                    }
                }
            }
        }

        self.report(WorkerPhase::Stopping).await;

        while pending > 0 {
            if pipe_rx.recv().await.is_some() {
                pending -= 1;
            } else {
                break;
            }
        }

        self.report(WorkerPhase::Finished).await;
    }

    /// Fetches one URL. A response of any status is reported as completed
    /// and handed to a pipeline task; a transport failure goes to the
    /// error sink and the URL's reservation is left as-is.
    async fn process(
        &self,
        url: &str,
        pipe_tx: &mpsc::UnboundedSender<()>,
        pending: &mut usize,
    ) {
        match self.fetcher.fetch(url).await {
            Ok(response) => {
                let _ = self
                    .completed
                    .send(CompletedRequest {
                        url: url.to_string(),
                        status: response.status,
                    })
                    .await;

                *pending += 1;
                tokio::spawn(run_pipeline(
                    response.body,
                    url.to_string(),
                    Arc::clone(&self.pipeline),
                    Arc::clone(&self.output),
                    self.discoveries.clone(),
                    self.errors.clone(),
                    pipe_tx.clone(),
                ));
            }
            Err(err) => {
                let _ = self.errors.send(err.into()).await;
            }
        }
    }

    async fn report(&self, phase: WorkerPhase) {
        tracing::debug!(worker = self.id, phase = %phase, "worker status");
        let _ = self
            .events
            .send(SupervisorEvent::Phase {
                worker: self.id,
                phase,
            })
            .await;
    }
}

/// Runs the pipeline over one response body and persists the result.
/// Always signals the worker's pending tracker, whatever happens: the
/// worker cannot reach Finished while a signal is owed.
async fn run_pipeline(
    body: Vec<u8>,
    url: String,
    pipeline: Arc<Pipeline>,
    output: Arc<dyn OutputSink>,
    discoveries: DiscoverySink,
    errors: mpsc::Sender<AmberError>,
    done: mpsc::UnboundedSender<()>,
) {
    match crate::url::parse_url(&url) {
        Ok(parsed) => {
            let (bytes, stage_errors) = pipeline.execute(body, &parsed, &discoveries);

            for err in stage_errors {
                let _ = errors.send(err.into()).await;
            }

            if let Err(err) = output.write(&parsed, &bytes).await {
                let _ = errors.send(err.into()).await;
            }
        }
        Err(err) => {
            let _ = errors.send(err.into()).await;
        }
    }

    // Everything this pipeline discovered must be routed before the
    // completion signal: the dispatch kicks for those links have to reach
    // the supervisor ahead of the idle report this signal can trigger.
    discoveries.flush().await;

    let _ = done.send(());
}
