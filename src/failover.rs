//! Routing of flushed batches to the online or offline destination.
//!
//! Each batch goes online when the online folder is reachable and no offline
//! backlog exists for today; otherwise it is appended to today's offline
//! file. Online writes retry a bounded number of times. A batch that cannot
//! be written anywhere goes back to the queue instead of being dropped.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;
use parking_lot::{Mutex, MutexGuard};

use crate::destination::{DestinationKind, LogDestination, append_line};
use crate::error::WriteError;
use crate::queue::{Batch, PendingQueue};
use crate::rate_limited_warner::RateLimitedWarner;
use crate::state::WriterState;

/// Default number of online write attempts per batch.
pub const DEFAULT_RETRY_COUNT: u32 = 50;
/// Hard ceiling on online write attempts, whatever the configured count.
pub const MAX_RETRY_COUNT: u32 = 100;
/// Default pause between online write attempts.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            pause: DEFAULT_RETRY_PAUSE,
        }
    }
}

impl RetryPolicy {
    /// Attempts actually made: the configured count capped at
    /// [`MAX_RETRY_COUNT`], and never fewer than one.
    pub fn attempts(&self) -> u32 {
        self.retry_count.clamp(1, MAX_RETRY_COUNT)
    }
}

/// Result of handing a batch to [`FailoverWriter::write_batch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Persisted to the given destination.
    Written(DestinationKind),
    /// Not persisted; the batch is back in the queue for a later flush.
    Requeued,
    /// Logging is disabled; the batch was discarded.
    Disabled,
}

pub struct FailoverWriter {
    online: LogDestination,
    offline: LogDestination,
    state: Arc<WriterState>,
    queue: Arc<PendingQueue>,
    retry: RetryPolicy,
    routing: Mutex<()>,
    warner: RateLimitedWarner,
}

impl FailoverWriter {
    pub fn new(
        online: LogDestination,
        offline: LogDestination,
        state: Arc<WriterState>,
        queue: Arc<PendingQueue>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            online,
            offline,
            state,
            queue,
            retry,
            routing: Mutex::new(()),
            warner: RateLimitedWarner::default(),
        }
    }

    /// Replace the warner used for re-queue warnings.
    pub fn with_warner(mut self, warner: RateLimitedWarner) -> Self {
        self.warner = warner;
        self
    }

    pub fn online(&self) -> &LogDestination {
        &self.online
    }

    pub fn offline(&self) -> &LogDestination {
        &self.offline
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Serializes routing decisions, offline appends and backlog merges.
    pub(crate) fn lock_routing(&self) -> MutexGuard<'_, ()> {
        self.routing.lock()
    }

    /// Persist a non-empty `batch`, falling back to the offline destination
    /// and finally to the queue. Never returns an error.
    pub fn write_batch(&self, batch: Batch) -> WriteOutcome {
        if self.state.is_disabled() {
            return WriteOutcome::Disabled;
        }
        match self.write_text(&batch.to_text()) {
            Ok(kind) => {
                self.warner.flush(|count| {
                    warn!("tandemlog: writes recovered after {count} re-queued batches");
                });
                WriteOutcome::Written(kind)
            }
            Err(err) => self.requeue(batch, &err),
        }
    }

    /// Route `text` like [`write_batch`](Self::write_batch) but report the
    /// final failure to the caller instead of re-queueing.
    pub fn write_text(&self, text: &str) -> Result<DestinationKind, WriteError> {
        let _routing = self.lock_routing();
        let offline_file = self.offline.current_file_path();
        if self.state.is_online() && !offline_file.exists() && self.online.try_ensure_folder() {
            // An exhausted online write does not fall through to the offline
            // file; the lines wait in the queue and are routed afresh.
            return self
                .write_online(&self.online.current_file_path(), text)
                .map(|()| DestinationKind::Online);
        }
        self.offline
            .ensure_folder()
            .map_err(|source| WriteError::FolderUnavailable {
                kind: DestinationKind::Offline,
                path: self.offline.folder().to_path_buf(),
                source,
            })?;
        append_line(&offline_file, text)?;
        Ok(DestinationKind::Offline)
    }

    /// Append `text` to `path` with bounded retries.
    ///
    /// Stops early with [`WriteError::Cancelled`] once the writer is asked to
    /// stop.
    pub fn write_online(&self, path: &Path, text: &str) -> Result<(), WriteError> {
        let attempts = self.retry.attempts();
        let mut last_error = None;
        for attempt in 1..=attempts {
            if !self.state.is_running() {
                return Err(WriteError::Cancelled);
            }
            match append_line(path, text) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    last_error = Some(err);
                    if attempt < attempts {
                        thread::sleep(self.retry.pause);
                    }
                }
            }
        }
        Err(WriteError::RetriesExhausted {
            path: path.to_path_buf(),
            attempts,
            source: last_error
                .unwrap_or_else(|| std::io::Error::other("no write attempt was made")),
        })
    }

    fn requeue(&self, batch: Batch, err: &WriteError) -> WriteOutcome {
        if self.state.is_disabled() {
            return WriteOutcome::Disabled;
        }
        log::debug!("tandemlog: re-queueing {} lines: {err}", batch.len());
        self.queue.requeue(batch);
        self.warner.record();
        self.warner.warn_if_due(|count| {
            warn!("tandemlog: {count} batches re-queued after failed writes; last error: {err}");
        });
        WriteOutcome::Requeued
    }
}
