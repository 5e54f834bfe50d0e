//! Content pipeline
//!
//! Each completed fetch hands its body to an ordered chain of
//! [`PipelineStage`]s. A stage may rewrite the bytes and may emit
//! discovered links through the [`DiscoverySink`]; it has no other side
//! effects. A failing stage does not abort the chain: later stages (and
//! the final persist) see the bytes as they stood before the failure.

mod extract;

pub use extract::{LinkExtractor, ResourceExtractor};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use url::Url;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage {stage}: {message}")]
    Stage { stage: &'static str, message: String },
}

/// A link candidate emitted by a pipeline stage, before resolution.
/// The candidate text may be relative to the source page.
#[derive(Debug, Clone)]
pub struct DiscoveredLink {
    pub source: Url,
    pub candidate: String,
}

/// Traffic on the discovery channel: link candidates, plus flush markers
/// the router acknowledges once everything ahead of them has been routed.
#[derive(Debug)]
pub enum DiscoveryMessage {
    Link(DiscoveredLink),
    Flush(oneshot::Sender<()>),
}

/// Write side of the discovery channel, handed to pipeline stages.
///
/// Emission never blocks: stages are plain synchronous code and the router
/// keeps the channel drained on its own task.
#[derive(Clone)]
pub struct DiscoverySink {
    tx: mpsc::UnboundedSender<DiscoveryMessage>,
}

impl DiscoverySink {
    pub fn new(tx: mpsc::UnboundedSender<DiscoveryMessage>) -> Self {
        Self { tx }
    }

    /// Emits a raw link candidate found on `source`. Dropped silently if
    /// the router has shut down.
    pub fn emit(&self, source: &Url, candidate: &str) {
        let _ = self.tx.send(DiscoveryMessage::Link(DiscoveredLink {
            source: source.clone(),
            candidate: candidate.to_string(),
        }));
    }

    /// Resolves once every link emitted through this sink so far has been
    /// routed. A pipeline task flushes before announcing completion, so a
    /// worker never reports idle ahead of the dispatch kicks its own
    /// discoveries produce.
    pub(crate) async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(DiscoveryMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// One stage of content transformation.
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transforms `body`, emitting any discovered links to `sink`.
    /// Returns `Ok(None)` when the bytes are unchanged.
    fn run(
        &self,
        body: &[u8],
        source: &Url,
        sink: &DiscoverySink,
    ) -> Result<Option<Vec<u8>>, PipelineError>;
}

/// An ordered chain of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        Self { stages }
    }

    /// The default chain: follow every link and resource on the page.
    pub fn standard() -> Self {
        Self::new(vec![Box::new(LinkExtractor)])
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Threads `body` through every stage in order. Stage errors are
    /// collected and returned alongside the final bytes; a failed stage
    /// leaves the bytes as they were before it ran.
    pub fn execute(
        &self,
        body: Vec<u8>,
        source: &Url,
        sink: &DiscoverySink,
    ) -> (Vec<u8>, Vec<PipelineError>) {
        let mut body = body;
        let mut errors = Vec::new();

        for stage in &self.stages {
            match stage.run(&body, source, sink) {
                Ok(Some(next)) => body = next,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(stage = stage.name(), error = %err, "pipeline stage failed");
                    errors.push(err);
                }
            }
        }

        (body, errors)
    }
}
