//! Crawler module: workers, dispatch, and coordination
//!
//! This module contains the core crawling machinery:
//! - The HTTP fetch capability consumed by workers
//! - The worker lifecycle state machine and pipeline hand-off
//! - The discovery router feeding found links back into the frontier
//! - The supervisor's reconciliation loop and completion detection

mod fetcher;
mod router;
mod supervisor;
mod worker;

pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use router::{accept_all, same_host, LinkPolicy};
pub use supervisor::Supervisor;
pub use worker::{CompletedRequest, WorkerPhase};

use crate::config::Config;
use crate::AmberError;

/// Runs a complete crawl with the default collaborators.
///
/// Builds a [`Supervisor`] from the configuration and drives it to
/// completion: seeds the frontier, fetches and preserves every reachable
/// page, and returns once the frontier drains and all workers are idle.
///
/// # Example
///
/// ```no_run
/// use webamber::config::load_config;
/// use webamber::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// crawl(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config) -> Result<(), AmberError> {
    Supervisor::new(config)?.run().await
}
