//! Background loops owned by [`TandemLog`](super::TandemLog).
//!
//! - normalizer threads turn raw messages into [`LogEntry`] lines and push
//!   them onto the pending queue;
//! - the flush loop drains the queue in capped batches through the
//!   [`FailoverWriter`];
//! - the initializer creates the folders and then starts the connectivity
//!   monitor, the reconciler and the flush loop.
//!
//! A message is taken off the work channel and pushed onto the queue under
//! one ordering lock. Inline normalization on the caller's thread takes the
//! same lock and first moves everything still in the channel, so the queue
//! always receives messages in the order they were submitted.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Select, Sender, TryRecvError, TrySendError};
use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::connectivity::ConnectivityMonitor;
use crate::failover::{FailoverWriter, WriteOutcome};
use crate::log_entry::{Identity, LogEntry};
use crate::message_type::LogMessageType;
use crate::notifier::Notifier;
use crate::queue::{InFlightToken, MAX_BATCH_SIZE, PendingQueue};
use crate::reconcile::Reconciler;
use crate::state::WriterState;

pub(crate) type Workers = Arc<Mutex<Vec<JoinHandle<()>>>>;

pub(crate) fn spawn_named<F>(name: &str, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new().name(name.to_owned()).spawn(f)
}

/// A message waiting to be normalized. Holds its in-flight token until it
/// lands in the queue.
pub(crate) struct RawMessage {
    message: String,
    message_type: LogMessageType,
    include_identity: bool,
    timestamp: DateTime<Utc>,
    _in_flight: InFlightToken,
}

#[derive(Clone)]
pub(crate) struct Normalizer {
    queue: Arc<PendingQueue>,
    state: Arc<WriterState>,
    identity: Arc<Identity>,
    ordering: Arc<Mutex<()>>,
}

impl Normalizer {
    pub(crate) fn new(
        queue: Arc<PendingQueue>,
        state: Arc<WriterState>,
        identity: Arc<Identity>,
    ) -> Self {
        Self {
            queue,
            state,
            identity,
            ordering: Arc::new(Mutex::new(())),
        }
    }

    /// Normalize and mirror. The line is queued only while the writer runs
    /// and logging is enabled; nothing drains the queue after shutdown.
    fn accept(&self, raw: RawMessage) {
        let identity = raw.include_identity.then_some(self.identity.as_ref());
        let entry = LogEntry::at(raw.timestamp, &raw.message, raw.message_type, identity);
        entry.mirror();
        if self.state.is_running() && !self.state.is_disabled() {
            self.queue.enqueue(entry);
        }
    }

    /// Take one message off `rx`, if any, and queue it. Returns `false` once
    /// the channel is disconnected.
    fn accept_next(&self, rx: &Receiver<RawMessage>) -> bool {
        let _order = self.ordering.lock();
        match rx.try_recv() {
            Ok(raw) => {
                self.accept(raw);
                true
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Queue every message still in `rx`, then `raw`.
    fn accept_after_backlog(&self, rx: &Receiver<RawMessage>, raw: RawMessage) {
        let _order = self.ordering.lock();
        while let Ok(waiting) = rx.try_recv() {
            self.accept(waiting);
        }
        self.accept(raw);
    }
}

/// Caller-side entry point; cheap to clone.
#[derive(Clone)]
pub(crate) struct Ingress {
    tx: Sender<RawMessage>,
    rx: Receiver<RawMessage>,
    normalizer: Normalizer,
}

impl Ingress {
    pub(crate) fn new(
        tx: Sender<RawMessage>,
        rx: Receiver<RawMessage>,
        normalizer: Normalizer,
    ) -> Self {
        Self { tx, rx, normalizer }
    }

    /// Hand a message to the normalizers without blocking. When the work
    /// queue is full or the writer has stopped, normalize inline behind
    /// everything already submitted.
    pub(crate) fn submit(
        &self,
        message: String,
        message_type: LogMessageType,
        include_identity: bool,
    ) {
        let raw = RawMessage {
            _in_flight: self.normalizer.queue.begin_enqueue(),
            message,
            message_type,
            include_identity,
            timestamp: Utc::now(),
        };
        if !self.normalizer.state.is_running() {
            self.normalizer.accept_after_backlog(&self.rx, raw);
            return;
        }
        match self.tx.try_send(raw) {
            Ok(()) => {}
            Err(TrySendError::Full(raw) | TrySendError::Disconnected(raw)) => {
                self.normalizer.accept_after_backlog(&self.rx, raw);
            }
        }
    }
}

pub(crate) fn normalize_loop(rx: Receiver<RawMessage>, normalizer: Normalizer, poll: Duration) {
    let mut ready = Select::new();
    ready.recv(&rx);
    while normalizer.state.is_running() {
        // Wait without receiving; the message is taken under the ordering lock.
        if ready.ready_timeout(poll).is_ok() && !normalizer.accept_next(&rx) {
            break;
        }
    }
    while !rx.is_empty() && normalizer.accept_next(&rx) {}
}

pub(crate) struct FlushLoop {
    queue: Arc<PendingQueue>,
    writer: Arc<FailoverWriter>,
    state: Arc<WriterState>,
    identity: Arc<Identity>,
    interval: Duration,
}

impl FlushLoop {
    pub(crate) fn new(
        queue: Arc<PendingQueue>,
        writer: Arc<FailoverWriter>,
        state: Arc<WriterState>,
        identity: Arc<Identity>,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            writer,
            state,
            identity,
            interval,
        }
    }

    /// Flush until stopped. A panic inside the loop disables logging and
    /// ends the loop without unwinding further.
    pub(crate) fn run(&self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            while self.state.is_running() && !self.state.is_disabled() {
                self.flush_pending();
                thread::sleep(self.interval);
            }
        }));
        if let Err(payload) = result {
            self.state.set_flushing(false);
            self.handle_fault(&panic_message(payload.as_ref()));
        }
    }

    /// Write batches until the queue is empty or a batch had to be
    /// re-queued. Returns the number of batches written.
    pub(crate) fn flush_pending(&self) -> usize {
        let mut written = 0;
        while !self.queue.is_empty() {
            self.state.set_flushing(true);
            let batch = self.queue.drain_batch(MAX_BATCH_SIZE);
            if batch.is_empty() {
                break;
            }
            match self.writer.write_batch(batch) {
                WriteOutcome::Written(_) => written += 1,
                WriteOutcome::Requeued | WriteOutcome::Disabled => break,
            }
        }
        self.state.set_flushing(false);
        written
    }

    /// Disable logging and make one best-effort attempt to record why.
    pub(crate) fn handle_fault(&self, description: &str) {
        if self.state.disable() {
            error!(
                "tandemlog: unexpected error while flushing; logging disabled for the rest of the session: {description}"
            );
        }
        let entry = LogEntry::new(
            &format!(
                "An unexpected error occurred while flushing the log queue. Logging is disabled for the remainder of the session. Error message: {description}"
            ),
            LogMessageType::Error,
            Some(&self.identity),
        );
        if let Err(err) = self.writer.write_text(entry.as_str()) {
            debug!("tandemlog: could not record flush failure: {err}");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// One-shot start-up: create folders, then start the background loops.
pub(crate) struct Initializer {
    pub(crate) app_name: String,
    pub(crate) state: Arc<WriterState>,
    pub(crate) writer: Arc<FailoverWriter>,
    pub(crate) ingress: Ingress,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) workers: Workers,
    pub(crate) monitor: ConnectivityMonitor,
    pub(crate) reconciler: Reconciler,
    pub(crate) flush: FlushLoop,
}

impl Initializer {
    pub(crate) fn run(self) {
        self.create_folders();
        let state = Arc::clone(&self.state);
        if !state.is_disabled() && state.is_running() {
            self.monitor.check();
            self.start_loops();
        }
        state.mark_initialized();
    }

    fn create_folders(&self) {
        let online = self.writer.online();
        let offline = self.writer.offline();
        match (online.ensure_folder(), offline.ensure_folder()) {
            (Ok(()), Ok(())) => {}
            (Ok(()), Err(err)) => self.ingress.submit(
                format!(
                    "Could not create offline log folder with path \"{}\". Error message: {err}",
                    offline.folder().display()
                ),
                LogMessageType::Warning,
                true,
            ),
            (Err(err), Ok(())) => self.ingress.submit(
                format!(
                    "Could not create online log folder with path \"{}\". Error message: {err}",
                    online.folder().display()
                ),
                LogMessageType::Warning,
                true,
            ),
            (Err(online_err), Err(offline_err)) => {
                if self.state.disable() {
                    error!(
                        "tandemlog: no log folder could be created (online: {online_err}; offline: {offline_err}); logging disabled"
                    );
                    self.notifier.notify(
                        &self.app_name,
                        &format!(
                            "{} could not create a folder for its logs.\nLogging will be disabled for the remainder of the session.",
                            self.app_name
                        ),
                    );
                }
            }
        }
    }

    fn start_loops(self) {
        let Initializer {
            monitor,
            reconciler,
            flush,
            workers,
            ..
        } = self;
        let spawned = [
            spawn_named("tandemlog-connectivity", move || monitor.run()),
            spawn_named("tandemlog-reconcile", move || reconciler.run()),
            spawn_named("tandemlog-flush", move || flush.run()),
        ];
        let mut workers = workers.lock();
        for handle in spawned {
            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => warn!("tandemlog: failed to start background loop: {err}"),
            }
        }
    }
}
