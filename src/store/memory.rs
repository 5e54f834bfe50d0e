use super::{StoreError, UrlStore};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// In-memory [`UrlStore`]: a map of known URLs and a FIFO of pending work
/// behind one mutex. Queue operations are cheap relative to network I/O,
/// so a single coarse lock wins over fine-grained concurrency here.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    /// URL -> status. 0 is the reservation placeholder.
    known: HashMap<String, u16>,
    queue: VecDeque<String>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                known: HashMap::new(),
                queue: VecDeque::new(),
                closed: false,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlStore for MemoryStore {
    fn enqueue(&self, url: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(StoreError::Closed);
        }

        if inner.known.contains_key(url) {
            return Err(StoreError::Duplicate(url.to_string()));
        }

        inner.known.insert(url.to_string(), 0);
        inner.queue.push_back(url.to_string());
        Ok(())
    }

    fn dequeue(&self) -> Option<String> {
        self.inner.lock().unwrap().queue.pop_front()
    }

    fn record_completion(&self, url: &str, status: u16) {
        self.inner
            .lock()
            .unwrap()
            .known
            .insert(url.to_string(), status);
    }

    fn is_exhausted(&self) -> bool {
        self.inner.lock().unwrap().queue.is_empty()
    }

    fn close(&self) {
        self.inner.lock().unwrap().closed = true;
    }

    fn clear(&self) {
        self.inner.lock().unwrap().queue.clear();
    }

    fn release(&self, url: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.known.get(url) == Some(&0) {
            inner.known.remove(url);
        }
    }

    fn completion(&self, url: &str) -> Option<u16> {
        self.inner.lock().unwrap().known.get(url).copied()
    }

    fn queued_len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    fn known_len(&self) -> usize {
        self.inner.lock().unwrap().known.len()
    }
}
