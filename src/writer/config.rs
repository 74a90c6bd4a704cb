//! Builder for [`TandemLog`](super::TandemLog).
//!
//! Defaults reproduce the classic timings: 50 ms polling for every loop,
//! 50 online write attempts 1 ms apart, and the bounded shutdown phases of
//! [`ShutdownTimeouts::default`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::connectivity::DEFAULT_CONNECTIVITY_INTERVAL;
use crate::error::BuildError;
use crate::failover::RetryPolicy;
use crate::log_entry::Identity;
use crate::notifier::{LogNotifier, Notifier};
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;
use crate::reconcile::DEFAULT_RECONCILE_INTERVAL;

use super::TandemLog;
use super::shutdown::ShutdownTimeouts;

/// Default delay between flush passes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);
/// Default bound of the normalizer work queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default number of normalizer threads. Any count keeps arrival order, since
/// each message is taken and queued under a shared ordering lock.
pub const DEFAULT_NORMALIZER_THREADS: usize = 1;

const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Clone)]
pub struct TandemLogBuilder {
    pub(crate) online_folder: PathBuf,
    pub(crate) offline_folder: PathBuf,
    pub(crate) app_name: String,
    pub(crate) retry: RetryPolicy,
    pub(crate) connectivity_interval: Duration,
    pub(crate) reconcile_interval: Duration,
    pub(crate) flush_interval: Duration,
    pub(crate) channel_capacity: usize,
    pub(crate) normalizer_threads: usize,
    pub(crate) requeue_warn_interval: Duration,
    pub(crate) shutdown: ShutdownTimeouts,
    pub(crate) identity: Option<Identity>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl TandemLogBuilder {
    pub fn new(
        online_folder: impl Into<PathBuf>,
        offline_folder: impl Into<PathBuf>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            online_folder: online_folder.into(),
            offline_folder: offline_folder.into(),
            app_name: app_name.into(),
            retry: RetryPolicy::default(),
            connectivity_interval: DEFAULT_CONNECTIVITY_INTERVAL,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            normalizer_threads: DEFAULT_NORMALIZER_THREADS,
            requeue_warn_interval: DEFAULT_WARN_INTERVAL,
            shutdown: ShutdownTimeouts::default(),
            identity: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Online write attempts per batch; values above 100 are capped.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry.retry_count = retry_count;
        self
    }

    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry.pause = pause;
        self
    }

    pub fn with_connectivity_interval(mut self, interval: Duration) -> Self {
        self.connectivity_interval = interval;
        self
    }

    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_normalizer_threads(mut self, threads: usize) -> Self {
        self.normalizer_threads = threads;
        self
    }

    pub fn with_requeue_warn_interval(mut self, interval: Duration) -> Self {
        self.requeue_warn_interval = interval;
        self
    }

    pub fn with_shutdown_timeouts(mut self, timeouts: ShutdownTimeouts) -> Self {
        self.shutdown = timeouts;
        self
    }

    /// Override the user and host appended to identified lines.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        let name = self.app_name.trim();
        if name.is_empty() {
            return Err(BuildError::InvalidConfig(
                "app_name must not be empty".into(),
            ));
        }
        if name.len() != self.app_name.len()
            || self
                .app_name
                .chars()
                .any(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c))
        {
            return Err(BuildError::InvalidConfig(format!(
                "app_name {:?} cannot be used in a file name",
                self.app_name
            )));
        }
        if self.retry.retry_count == 0 {
            return Err(BuildError::InvalidConfig(
                "retry_count must be greater than zero".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(BuildError::InvalidConfig(
                "channel_capacity must be greater than zero".into(),
            ));
        }
        if self.normalizer_threads == 0 {
            return Err(BuildError::InvalidConfig(
                "normalizer_threads must be greater than zero".into(),
            ));
        }
        for (field, interval) in [
            ("connectivity_interval", self.connectivity_interval),
            ("reconcile_interval", self.reconcile_interval),
            ("flush_interval", self.flush_interval),
        ] {
            if interval.is_zero() {
                return Err(BuildError::InvalidConfig(format!(
                    "{field} must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    /// Validate the settings and start the writer.
    pub fn build(self) -> Result<TandemLog, BuildError> {
        TandemLog::from_builder(self)
    }
}
