//! Pending-line queue shared by the normalizers and the flush loop.
//!
//! Insertion and batch removal share one lock. The queue also counts
//! enqueue operations that have started but not yet landed, which shutdown
//! uses to decide when it is safe to stop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::log_entry::LogEntry;

/// Upper bound on the number of lines written by a single flush.
pub const MAX_BATCH_SIZE: usize = 5;

/// Separator placed between lines of a batch.
pub const BATCH_SEPARATOR: &str = "\n";

/// Lines removed from the queue together, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    lines: Vec<String>,
}

impl Batch {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The batch as it is written to disk.
    pub fn to_text(&self) -> String {
        self.lines.join(BATCH_SEPARATOR)
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Marks one enqueue operation as in flight until dropped.
#[derive(Debug)]
pub struct InFlightToken {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: Mutex<VecDeque<String>>,
    in_flight: Arc<AtomicUsize>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enqueue that has started; the count drops with the token.
    pub fn begin_enqueue(&self) -> InFlightToken {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightToken {
            counter: Arc::clone(&self.in_flight),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Insert at the newest end.
    pub fn enqueue(&self, entry: LogEntry) {
        self.entries.lock().push_back(entry.into_string());
    }

    /// Remove up to `max` of the oldest lines, in arrival order.
    pub fn drain_batch(&self, max: usize) -> Batch {
        let mut entries = self.entries.lock();
        let take = max.min(entries.len());
        Batch::new(entries.drain(..take).collect())
    }

    /// Put a batch that could not be written back at the oldest end, keeping
    /// its lines ahead of everything that arrived since.
    pub fn requeue(&self, batch: Batch) {
        let mut entries = self.entries.lock();
        for line in batch.into_lines().into_iter().rev() {
            entries.push_front(line);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
