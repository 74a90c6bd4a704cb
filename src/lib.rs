//! Crash-tolerant application log writer with online/offline failover.
//!
//! Lines are written to a shared "online" folder while it is reachable and
//! to a local "offline" folder otherwise. Offline backlog is merged back
//! into the online folder once it returns, one daily file at a time.
//! Logging never raises into the caller: failures are retried, re-queued,
//! or, as a last resort, disable logging for the rest of the session.

mod connectivity;
mod destination;
mod error;
mod failover;
mod file_config;
mod log_entry;
mod message_type;
mod notifier;
mod object_info;
mod queue;
mod rate_limited_warner;
mod reconcile;
mod state;
mod writer;

pub use connectivity::{ConnectivityMonitor, DEFAULT_CONNECTIVITY_INTERVAL};
pub use destination::{DestinationKind, LOG_FILE_EXTENSION, LogDestination, append_line};
pub use error::{BuildError, ConfigError, ReconcileError, WriteError};
pub use failover::{
    DEFAULT_RETRY_COUNT, DEFAULT_RETRY_PAUSE, FailoverWriter, MAX_RETRY_COUNT, RetryPolicy,
    WriteOutcome,
};
pub use file_config::{FileConfig, INI_SECTION};
pub use log_entry::{Identity, LogEntry, MIRROR_TARGET, format_timestamp, sanitize_message};
pub use message_type::{LogMessageType, ParseMessageTypeError, RESERVED_PREFIXES};
pub use notifier::{LogNotifier, Notifier};
pub use object_info::{ObjectRegistry, TrackedObject};
pub use queue::{BATCH_SEPARATOR, Batch, InFlightToken, MAX_BATCH_SIZE, PendingQueue};
pub use rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner};
pub use reconcile::{DEFAULT_RECONCILE_INTERVAL, MigrationOutcome, Reconciler};
pub use state::WriterState;
pub use writer::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_FLUSH_INTERVAL, DEFAULT_NORMALIZER_THREADS, ShutdownReport,
    ShutdownTimeouts, TandemLog, TandemLogBuilder,
};
