//! Dedup/queue store for the crawl frontier
//!
//! The store is the single source of truth for which URLs have been seen
//! and which are pending dispatch. A URL is *reserved* at enqueue time,
//! before it is dispatched or completed, so a link discovered by two
//! workers at nearly the same instant is accepted by exactly one caller.
//!
//! Statuses live in one map: absent = never seen, 0 = reserved, non-zero =
//! completed with that HTTP status. A reservation is never given back on
//! fetch failure; a failed URL stays reserved for the rest of the run and
//! is never retried (see [`UrlStore::release`] for the opt-in alternative).

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

/// Errors returned by [`UrlStore::enqueue`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("already processed link {0}, ignoring")]
    Duplicate(String),

    #[error("queue is not accepting new urls")]
    Closed,
}

/// Tracks work to be done and completed work.
///
/// All methods must be callable concurrently; implementations are expected
/// to guard reservation and queueing with a single lock so the two stay
/// atomic. The default in-memory implementation is [`MemoryStore`]; an
/// alternative could share the queue between processes or persist it.
pub trait UrlStore: Send + Sync {
    /// Reserves `url` and appends it to the queue tail.
    ///
    /// Fails with [`StoreError::Duplicate`] if the URL is already reserved
    /// or completed, or [`StoreError::Closed`] after [`UrlStore::close`].
    fn enqueue(&self, url: &str) -> Result<(), StoreError>;

    /// Pops and returns the queue head. Does not change the record's
    /// reserved/completed status.
    fn dequeue(&self) -> Option<String>;

    /// Overwrites the URL's status with the final response code.
    fn record_completion(&self, url: &str, status: u16);

    /// True iff the queue is empty.
    ///
    /// This does not account for URLs dispatched but not yet completed, or
    /// for in-flight pipeline tasks that might still emit new discoveries.
    fn is_exhausted(&self) -> bool;

    /// Stops future enqueues from succeeding. Already-queued entries are
    /// not drained.
    fn close(&self);

    /// Drops all queued entries. Recorded statuses are untouched.
    fn clear(&self);

    /// Forgets a reservation so the URL may be offered again. Only used
    /// when the retry-failed policy is enabled; a no-op for completed URLs.
    fn release(&self, url: &str);

    /// Returns the recorded status for a URL: `Some(0)` while reserved,
    /// `Some(code)` once completed, `None` if never seen.
    fn completion(&self, url: &str) -> Option<u16>;

    /// Number of entries waiting for dispatch.
    fn queued_len(&self) -> usize;

    /// Number of URLs ever reserved.
    fn known_len(&self) -> usize;
}
