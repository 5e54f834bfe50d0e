//! Discovery router
//!
//! Consumes links emitted by pipeline stages, resolves them against their
//! source page, applies the acceptance policy, and offers survivors to the
//! store. A successful enqueue kicks the supervisor so spare capacity is
//! used immediately instead of waiting for the next state-driven dispatch;
//! the kick travels through the reconciliation queue, which stays the only
//! writer of dispatch state.

use crate::crawler::supervisor::SupervisorEvent;
use crate::pipeline::{DiscoveredLink, DiscoveryMessage};
use crate::store::{StoreError, UrlStore};
use crate::url::resolve_candidate;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Decides whether a resolved link should be queued, given the page it was
/// found on. The default accepts everything.
pub type LinkPolicy = Arc<dyn Fn(&Url, &Url) -> bool + Send + Sync>;

/// Accepts every discovered link.
pub fn accept_all() -> LinkPolicy {
    Arc::new(|_, _| true)
}

/// Accepts only links on the same host as the page they were found on.
pub fn same_host() -> LinkPolicy {
    Arc::new(|source, candidate| source.host_str() == candidate.host_str())
}

/// Consumer loop over the discovery channel. Runs until every sink clone
/// has been dropped. Flush markers are acknowledged in arrival order, so
/// an acknowledged flush means every link ahead of it has been offered to
/// the store and its dispatch kick is already in the event queue.
pub(crate) async fn route_discoveries(
    mut discoveries: mpsc::UnboundedReceiver<DiscoveryMessage>,
    store: Arc<dyn UrlStore>,
    policy: LinkPolicy,
    events: mpsc::Sender<SupervisorEvent>,
) {
    while let Some(message) = discoveries.recv().await {
        let link = match message {
            DiscoveryMessage::Link(link) => link,
            DiscoveryMessage::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
        };

        let resolved = match resolve_candidate(&link.source, &link.candidate) {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!(
                    candidate = %link.candidate,
                    source = %link.source,
                    error = %err,
                    "dropping unresolvable link"
                );
                continue;
            }
        };

        tracing::info!(url = %resolved, source = %link.source, "found link");

        if !(policy)(&link.source, &resolved) {
            tracing::debug!(url = %resolved, "link rejected by policy");
            continue;
        }

        match store.enqueue(resolved.as_str()) {
            Ok(()) => {
                let _ = events.send(SupervisorEvent::WorkQueued).await;
            }
            // Expected outcomes under concurrent discovery, not errors.
            Err(err @ StoreError::Duplicate(_)) => {
                tracing::info!("{}", err);
            }
            Err(err @ StoreError::Closed) => {
                tracing::info!(url = %resolved, "{}", err);
            }
        }
    }
}
