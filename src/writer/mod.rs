//! The failover log writer.
//!
//! `TandemLog` accepts messages from any thread without blocking, writes
//! them in arrival order to the online folder when it is reachable and to
//! the offline folder otherwise, and merges offline backlog into the online
//! folder once it comes back.
//!
//! Construction returns immediately; folder creation and the background
//! loops start on a separate initialization thread. [`TandemLog::shutdown`]
//! (also run on drop) drains pending lines within bounded time.
//!
//! ```no_run
//! use tandemlog::{LogMessageType, TandemLog};
//!
//! let log = TandemLog::new("/mnt/share/logs", "/var/log/inventory", "Inventory")?;
//! log.enqueue("disk full", LogMessageType::Error, true);
//! log.shutdown();
//! # Ok::<(), tandemlog::BuildError>(())
//! ```

mod config;
mod shutdown;
pub(crate) mod worker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::bounded;
use parking_lot::Mutex;

use crate::connectivity::ConnectivityMonitor;
use crate::destination::{DestinationKind, LogDestination};
use crate::error::BuildError;
use crate::failover::FailoverWriter;
use crate::log_entry::Identity;
use crate::message_type::LogMessageType;
use crate::object_info::{ObjectRegistry, TrackedObject, short_type_name};
use crate::queue::PendingQueue;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::reconcile::Reconciler;
use crate::state::WriterState;

pub use config::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_FLUSH_INTERVAL, DEFAULT_NORMALIZER_THREADS, TandemLogBuilder,
};
pub use shutdown::{ShutdownReport, ShutdownTimeouts};

use shutdown::ShutdownCoordinator;
use worker::{FlushLoop, Ingress, Initializer, Normalizer, Workers, normalize_loop, spawn_named};

pub struct TandemLog {
    app_name: String,
    online: LogDestination,
    offline: LogDestination,
    state: Arc<WriterState>,
    queue: Arc<PendingQueue>,
    ingress: Ingress,
    objects: Arc<ObjectRegistry>,
    workers: Workers,
    shutdown_timeouts: ShutdownTimeouts,
    report: Mutex<Option<ShutdownReport>>,
}

impl TandemLog {
    /// Start a writer with default settings.
    pub fn new(
        online_folder: impl Into<PathBuf>,
        offline_folder: impl Into<PathBuf>,
        app_name: impl Into<String>,
    ) -> Result<Self, BuildError> {
        Self::builder(online_folder, offline_folder, app_name).build()
    }

    pub fn builder(
        online_folder: impl Into<PathBuf>,
        offline_folder: impl Into<PathBuf>,
        app_name: impl Into<String>,
    ) -> TandemLogBuilder {
        TandemLogBuilder::new(online_folder, offline_folder, app_name)
    }

    pub(crate) fn from_builder(builder: TandemLogBuilder) -> Result<Self, BuildError> {
        builder.validate()?;
        let TandemLogBuilder {
            online_folder,
            offline_folder,
            app_name,
            retry,
            connectivity_interval,
            reconcile_interval,
            flush_interval,
            channel_capacity,
            normalizer_threads,
            requeue_warn_interval,
            shutdown,
            identity,
            notifier,
        } = builder;

        let state = Arc::new(WriterState::new());
        let queue = Arc::new(PendingQueue::new());
        let identity = Arc::new(identity.unwrap_or_else(Identity::current));
        let online = LogDestination::new(DestinationKind::Online, online_folder, &app_name);
        let offline = LogDestination::new(DestinationKind::Offline, offline_folder, &app_name);
        let workers: Workers = Arc::new(Mutex::new(Vec::new()));

        let (tx, rx) = bounded(channel_capacity);
        let normalizer = Normalizer::new(
            Arc::clone(&queue),
            Arc::clone(&state),
            Arc::clone(&identity),
        );
        let abort = |err: std::io::Error| {
            state.stop();
            BuildError::Io(err)
        };
        for index in 0..normalizer_threads {
            let rx = rx.clone();
            let normalizer = normalizer.clone();
            let handle = spawn_named(&format!("tandemlog-normalize-{index}"), move || {
                normalize_loop(rx, normalizer, flush_interval)
            })
            .map_err(abort)?;
            workers.lock().push(handle);
        }
        let ingress = Ingress::new(tx, rx, normalizer);

        let writer = Arc::new(
            FailoverWriter::new(
                online.clone(),
                offline.clone(),
                Arc::clone(&state),
                Arc::clone(&queue),
                retry,
            )
            .with_warner(RateLimitedWarner::new(requeue_warn_interval)),
        );
        let initializer = Initializer {
            app_name: app_name.clone(),
            state: Arc::clone(&state),
            writer: Arc::clone(&writer),
            ingress: ingress.clone(),
            notifier,
            workers: Arc::clone(&workers),
            monitor: ConnectivityMonitor::new(
                online.clone(),
                Arc::clone(&state),
                connectivity_interval,
            ),
            reconciler: Reconciler::new(Arc::clone(&writer), Arc::clone(&state), reconcile_interval),
            flush: FlushLoop::new(
                Arc::clone(&queue),
                writer,
                Arc::clone(&state),
                identity,
                flush_interval,
            ),
        };
        let handle = spawn_named("tandemlog-init", move || initializer.run()).map_err(abort)?;
        workers.lock().push(handle);

        Ok(Self {
            app_name,
            online,
            offline,
            state,
            queue,
            ingress,
            objects: Arc::new(ObjectRegistry::new()),
            workers,
            shutdown_timeouts: shutdown,
            report: Mutex::new(None),
        })
    }

    /// Queue `message` for persistence. Never blocks on I/O and never fails.
    ///
    /// After [`shutdown`](Self::shutdown) the message is still normalized and
    /// mirrored, but no longer written.
    pub fn enqueue(
        &self,
        message: impl Into<String>,
        message_type: LogMessageType,
        include_identity: bool,
    ) {
        self.ingress
            .submit(message.into(), message_type, include_identity);
    }

    /// Queue `message` with the identity suffix.
    pub fn log(&self, message_type: LogMessageType, message: impl Into<String>) {
        self.enqueue(message, message_type, true);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogMessageType::Error, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogMessageType::Warning, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogMessageType::Information, message);
    }

    pub fn verbose(&self, message: impl Into<String>) {
        self.log(LogMessageType::Verbose, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogMessageType::Debug, message);
    }

    /// Start tracking an object of `type_name`; see [`TrackedObject`].
    pub fn track_object(&self, type_name: &str, expects_multiple: bool) -> TrackedObject {
        TrackedObject::register(
            Arc::clone(&self.objects),
            self.ingress.clone(),
            type_name,
            expects_multiple,
        )
    }

    /// Track an object of type `T`, named after the type.
    pub fn track<T: ?Sized>(&self, expects_multiple: bool) -> TrackedObject {
        self.track_object(short_type_name::<T>(), expects_multiple)
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// Drain pending lines and stop the background loops, within the bounds
    /// of the configured [`ShutdownTimeouts`].
    ///
    /// Later calls return the first report immediately.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut report = self.report.lock();
        if let Some(report) = *report {
            return report;
        }
        let result = ShutdownCoordinator {
            timeouts: self.shutdown_timeouts,
            state: &self.state,
            queue: &self.queue,
            workers: &self.workers,
        }
        .run();
        *report = Some(result);
        result
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn online_destination(&self) -> &LogDestination {
        &self.online
    }

    pub fn offline_destination(&self) -> &LogDestination {
        &self.offline
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    pub fn is_disabled(&self) -> bool {
        self.state.is_disabled()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    /// Poll interval used by the shutdown phases.
    pub fn shutdown_poll(&self) -> Duration {
        self.shutdown_timeouts.poll
    }
}

impl Drop for TandemLog {
    fn drop(&mut self) {
        self.shutdown();
    }
}
